use camfilter_core::collection::Pose;

/// Represents an image in the Colmap system.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapImage {
    /// Image name
    pub name: String,
    /// Image id
    pub image_id: u32,
    /// Camera id
    pub camera_id: u32,
    /// Rotation
    pub rotation: [f64; 4], // qw, qx, qy, qz
    /// Translation
    pub translation: [f64; 3], // x, y, z
    /// Points2d
    pub points2d: Vec<(f64, f64, i64)>,
}

impl ColmapImage {
    /// Get the camera pose of the image.
    pub fn pose(&self) -> Pose {
        Pose::new(self.rotation, self.translation)
    }
}

/// Represents a 3D point in the Colmap system.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapPoint3d {
    /// Point3d id
    pub point3d_id: u64,
    /// x, y, z coordinates
    pub xyz: [f64; 3],
    /// rgb color
    pub rgb: [u8; 3],
    /// Reprojection error
    pub error: f64,
    /// Track as (image id, point2d index) pairs
    pub track: Vec<(u32, u32)>,
}

impl ColmapPoint3d {
    /// Check whether every image observing the point is accepted by `keep`.
    pub fn observed_only_by(&self, mut keep: impl FnMut(u32) -> bool) -> bool {
        self.track.iter().all(|&(image_id, _)| keep(image_id))
    }
}
