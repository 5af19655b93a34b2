use glam::{DMat3, DQuat, DVec3};

use crate::error::FilterError;

/// A point in the shared frame of the reconstruction.
pub type WorldPoint = [f64; 3];

/// Convert a COLMAP quaternion into a normalized rotation matrix.
///
/// # Arguments
///
/// * `q` - The rotation quaternion as `[qw, qx, qy, qz]`.
///
/// # Returns
///
/// The rotation matrix, or `FilterError::InvalidRotation` when the quaternion
/// has non-finite components or a vanishing norm.
pub fn quaternion_to_rotation_matrix(q: &[f64; 4]) -> Result<DMat3, FilterError> {
    let norm = q.iter().map(|v| v * v).sum::<f64>().sqrt();
    if !norm.is_finite() || norm < 1e-12 {
        return Err(FilterError::InvalidRotation(*q));
    }
    let quat = DQuat::from_xyzw(q[1] / norm, q[2] / norm, q[3] / norm, q[0] / norm);
    Ok(DMat3::from_quat(quat))
}

fn checked_vector(t: &[f64; 3]) -> Result<DVec3, FilterError> {
    let v = DVec3::from_array(*t);
    match v.is_finite() {
        true => Ok(v),
        false => Err(FilterError::InvalidTranslation(*t)),
    }
}

/// Compute the camera center in world coordinates.
///
/// Evaluates `-R(q)^T * t` where `R(q)` is the rotation of the quaternion.
///
/// Example:
///
/// ```
/// use camfilter_core::transforms::world_coordinates;
///
/// let q = [1.0, 0.0, 0.0, 0.0];
/// let point = world_coordinates(&q, &[1.0, 2.0, 3.0]).unwrap();
/// assert_eq!(point, [-1.0, -2.0, -3.0]);
/// ```
pub fn world_coordinates(q: &[f64; 4], t: &[f64; 3]) -> Result<WorldPoint, FilterError> {
    let rotation = quaternion_to_rotation_matrix(q)?;
    let t = checked_vector(t)?;
    Ok((-(rotation.transpose() * t)).to_array())
}

/// Compute the camera translation from its center in world coordinates.
///
/// Evaluates `-R(q) * X`, the inverse of [`world_coordinates`].
pub fn colmap_coordinates(q: &[f64; 4], x: &WorldPoint) -> Result<[f64; 3], FilterError> {
    let rotation = quaternion_to_rotation_matrix(q)?;
    let x = checked_vector(x)?;
    Ok((-(rotation * x)).to_array())
}

/// Displace a camera center by a world-space vector.
///
/// # Arguments
///
/// * `q` - The rotation quaternion as `[qw, qx, qy, qz]`.
/// * `t` - The camera translation.
/// * `delta` - The displacement in world coordinates.
///
/// # Returns
///
/// The translation of the displaced camera.
pub fn add_vector(q: &[f64; 4], t: &[f64; 3], delta: &[f64; 3]) -> Result<[f64; 3], FilterError> {
    let center = DVec3::from_array(world_coordinates(q, t)?) + checked_vector(delta)?;
    colmap_coordinates(q, &center.to_array())
}
