use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    error::FilterError,
    id::{extract_identifier, ImageId},
    transforms::{world_coordinates, WorldPoint},
};

/// A camera pose in the native COLMAP representation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Rotation quaternion as `[qw, qx, qy, qz]`.
    pub rotation: [f64; 4],
    /// Translation vector.
    pub translation: [f64; 3],
}

impl Pose {
    /// Create a new pose from a quaternion and a translation.
    pub fn new(rotation: [f64; 4], translation: [f64; 3]) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Get the camera center in world coordinates.
    pub fn world_point(&self) -> Result<WorldPoint, FilterError> {
        world_coordinates(&self.rotation, &self.translation)
    }
}

/// How the neighbors of a collection are searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborMode {
    /// Nearest neighbors by Euclidean distance between camera centers.
    Geometric,
    /// Adjacent images in capture order, for passages without geometry.
    Sequential,
}

/// A single image of a pose collection.
#[derive(Debug, Clone, PartialEq)]
struct PoseEntry {
    id: ImageId,
    // present for reconstructions
    pose: Option<Pose>,
    // present for geometric sources
    point: Option<WorldPoint>,
}

/// Ordered poses of one source, a reconstruction or a passage.
///
/// The order of insertion is preserved since the sequential neighbor search
/// depends on it. Collections are immutable: narrowing with
/// [`PoseCollection::restrict`] produces a new value, so maps derived from the
/// original collection never describe the narrowed one.
#[derive(Debug, Clone)]
pub struct PoseCollection {
    mode: NeighborMode,
    entries: Vec<PoseEntry>,
    index: HashMap<ImageId, usize>,
}

impl PoseCollection {
    /// Build a geometric collection from COLMAP poses keyed by image name.
    ///
    /// # Arguments
    ///
    /// * `poses` - Pairs of image file name and pose.
    ///
    /// # Returns
    ///
    /// The collection with the camera centers precomputed.
    ///
    /// Example:
    ///
    /// ```
    /// use camfilter_core::collection::{Pose, PoseCollection};
    ///
    /// let identity = [1.0, 0.0, 0.0, 0.0];
    /// let poses = PoseCollection::from_poses([
    ///     ("ios_1.jpg", Pose::new(identity, [0.0, 0.0, 0.0])),
    ///     ("ios_2.jpg", Pose::new(identity, [-1.0, 0.0, 0.0])),
    /// ])
    /// .unwrap();
    /// assert_eq!(poses.len(), 2);
    /// assert_eq!(poses.point("2").unwrap(), &[1.0, 0.0, 0.0]);
    /// ```
    pub fn from_poses<I, S>(poses: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = (S, Pose)>,
        S: AsRef<str>,
    {
        let entries = poses
            .into_iter()
            .map(|(name, pose)| {
                Ok(PoseEntry {
                    id: extract_identifier(name.as_ref())?,
                    point: Some(pose.world_point()?),
                    pose: Some(pose),
                })
            })
            .collect::<Result<Vec<_>, FilterError>>()?;
        Self::from_entries(NeighborMode::Geometric, entries)
    }

    /// Build a geometric collection from camera centers keyed by image name.
    pub fn from_positions<I, S>(positions: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = (S, WorldPoint)>,
        S: AsRef<str>,
    {
        let entries = positions
            .into_iter()
            .map(|(name, point)| {
                if point.iter().any(|v| !v.is_finite()) {
                    return Err(FilterError::InvalidTranslation(point));
                }
                Ok(PoseEntry {
                    id: extract_identifier(name.as_ref())?,
                    pose: None,
                    point: Some(point),
                })
            })
            .collect::<Result<Vec<_>, FilterError>>()?;
        Self::from_entries(NeighborMode::Geometric, entries)
    }

    /// Build a sequential collection from image names in capture order.
    pub fn from_sequence<I, S>(names: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = names
            .into_iter()
            .map(|name| {
                Ok(PoseEntry {
                    id: extract_identifier(name.as_ref())?,
                    pose: None,
                    point: None,
                })
            })
            .collect::<Result<Vec<_>, FilterError>>()?;
        Self::from_entries(NeighborMode::Sequential, entries)
    }

    fn from_entries(mode: NeighborMode, entries: Vec<PoseEntry>) -> Result<Self, FilterError> {
        let mut index = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            if index.insert(entry.id.clone(), i).is_some() {
                return Err(FilterError::DuplicateIdentifier(entry.id.clone()));
            }
        }
        Ok(Self {
            mode,
            entries,
            index,
        })
    }

    /// Keep only the poses whose identifier is in `keep_ids`.
    ///
    /// The relative order of the remaining poses is preserved.
    pub fn restrict(&self, keep_ids: &HashSet<ImageId>) -> Self {
        self.retain(|id| keep_ids.contains(id))
    }

    /// Keep only the poses that are also part of `other`.
    pub fn restrict_to(&self, other: &PoseCollection) -> Self {
        self.retain(|id| other.contains(id.as_str()))
    }

    fn retain(&self, keep: impl Fn(&ImageId) -> bool) -> Self {
        let entries = self
            .entries
            .iter()
            .filter(|entry| keep(&entry.id))
            .cloned()
            .collect::<Vec<_>>();
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.id.clone(), i))
            .collect();
        Self {
            mode: self.mode,
            entries,
            index,
        }
    }

    /// Get the neighbor search mode of the source.
    pub fn mode(&self) -> NeighborMode {
        self.mode
    }

    /// Get the number of poses in the collection.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the collection is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check whether the collection holds the identifier.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Get the position of the identifier in the collection order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Iterate over the identifiers in collection order.
    pub fn ids(&self) -> impl Iterator<Item = &ImageId> {
        self.entries.iter().map(|entry| &entry.id)
    }

    /// Get the native pose of an image, if the source carries one.
    pub fn pose(&self, id: &str) -> Option<&Pose> {
        self.position(id).and_then(|i| self.entries[i].pose.as_ref())
    }

    /// Get the camera center of an image.
    pub fn point(&self, id: &str) -> Result<&WorldPoint, FilterError> {
        let entry = self
            .position(id)
            .map(|i| &self.entries[i])
            .ok_or_else(|| FilterError::UnknownIdentifier(ImageId::new(id)))?;
        entry
            .point
            .as_ref()
            .ok_or_else(|| FilterError::MissingGeometry(entry.id.clone()))
    }

    /// Collect the camera centers in collection order.
    pub fn points(&self) -> Result<Vec<WorldPoint>, FilterError> {
        self.entries
            .iter()
            .map(|entry| {
                entry
                    .point
                    .ok_or_else(|| FilterError::MissingGeometry(entry.id.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: [f64; 4] = [1.0, 0.0, 0.0, 0.0];

    fn line(n: usize) -> Result<PoseCollection, FilterError> {
        PoseCollection::from_poses(
            (0..n).map(|i| (format!("ios_{i}.jpg"), Pose::new(IDENTITY, [-(i as f64), 0.0, 0.0]))),
        )
    }

    #[test]
    fn test_from_poses_world_points() -> Result<(), FilterError> {
        let poses = line(3)?;
        assert_eq!(poses.mode(), NeighborMode::Geometric);
        assert_eq!(poses.point("2")?, &[2.0, 0.0, 0.0]);
        assert!(poses.pose("1").is_some());
        Ok(())
    }

    #[test]
    fn test_duplicate_identifier() {
        let res = PoseCollection::from_sequence(["a_1.jpg", "b_2.jpg", "c_1.JPG"]);
        assert!(matches!(res, Err(FilterError::DuplicateIdentifier(id)) if id.as_str() == "1"));
    }

    #[test]
    fn test_unparsable_name() {
        let res = PoseCollection::from_positions([("camera.png", [0.0; 3])]);
        assert!(matches!(res, Err(FilterError::ParseError(_))));
    }

    #[test]
    fn test_restrict_preserves_order() -> Result<(), FilterError> {
        let poses = line(6)?;
        let keep = ["4", "1", "3"].into_iter().map(ImageId::from).collect();
        let narrowed = poses.restrict(&keep);

        let ids = narrowed.ids().map(ImageId::as_str).collect::<Vec<_>>();
        assert_eq!(ids, vec!["1", "3", "4"]);
        assert_eq!(narrowed.position("4"), Some(2));
        assert!(!narrowed.contains("0"));
        // the source collection is untouched
        assert_eq!(poses.len(), 6);
        Ok(())
    }

    #[test]
    fn test_sequence_has_no_geometry() -> Result<(), FilterError> {
        let passage = PoseCollection::from_sequence(["ios_1.jpg", "ios_2.jpg"])?;
        assert_eq!(passage.mode(), NeighborMode::Sequential);
        assert!(matches!(passage.point("1"), Err(FilterError::MissingGeometry(_))));
        assert!(matches!(passage.point("9"), Err(FilterError::UnknownIdentifier(_))));
        Ok(())
    }
}
