use crate::{
    collection::PoseCollection,
    distance::{euclidean_distance, representative_distance, DistanceMap},
    error::FilterError,
    id::{IdMap, ImageId},
    interval::ConfidenceInterval,
    neighbors::NeighborMap,
};

/// Anomaly flag of every pose of the reconstruction, in collection order.
pub type AnomalyFlags = IdMap<bool>;

/// Resolve the two neighbors used to measure the true distance of a pose.
///
/// Candidates are taken in order: the two passage neighbors, then the two
/// reconstruction neighbors. Duplicates, the pose itself and images missing
/// from the reconstruction are skipped; the first two survivors are kept.
///
/// # Arguments
///
/// * `subject` - The pose being measured.
/// * `passage` - The neighbors of the pose in the passage.
/// * `reconstruction` - The neighbors of the pose in the reconstruction.
/// * `poses` - The reconstruction.
///
/// # Returns
///
/// The two usable neighbors, or `FilterError::NoUsableNeighbors`.
pub fn usable_neighbors<'a>(
    subject: &ImageId,
    passage: &'a [ImageId; 2],
    reconstruction: &'a [ImageId; 2],
    poses: &PoseCollection,
) -> Result<[&'a ImageId; 2], FilterError> {
    let mut used: Vec<&ImageId> = Vec::with_capacity(2);
    for candidate in passage.iter().chain(reconstruction.iter()) {
        if candidate == subject
            || used.contains(&candidate)
            || !poses.contains(candidate.as_str())
        {
            continue;
        }
        used.push(candidate);
        if let [first, second] = used[..] {
            return Ok([first, second]);
        }
    }
    Err(FilterError::NoUsableNeighbors(subject.clone()))
}

/// Compute the distance of every reconstruction pose to its true neighbors.
///
/// Without passage neighbors the reconstruction is trusted as ground truth and
/// its own distance map is returned. The acceptance interval is then derived
/// from the same data it classifies, which weakens the test.
///
/// # Arguments
///
/// * `poses` - The reconstruction.
/// * `neighbors` - The neighbor map of the reconstruction.
/// * `distances` - The distance map of the reconstruction.
/// * `passage_neighbors` - The neighbor map of the passage, if any.
///
/// # Returns
///
/// The distances to the true neighbors, measured in the reconstruction.
pub fn true_distances(
    poses: &PoseCollection,
    neighbors: &NeighborMap,
    distances: &DistanceMap,
    passage_neighbors: Option<&NeighborMap>,
) -> Result<DistanceMap, FilterError> {
    let Some(passage_neighbors) = passage_neighbors else {
        return Ok(distances.clone());
    };

    poses
        .ids()
        .map(|id| {
            let passage_pair = passage_neighbors
                .get(id.as_str())
                .ok_or_else(|| FilterError::NoUsableNeighbors(id.clone()))?;
            let reconstruction_pair = neighbors
                .get(id.as_str())
                .ok_or_else(|| FilterError::UnknownIdentifier(id.clone()))?;

            let [first, second] = usable_neighbors(id, passage_pair, reconstruction_pair, poses)?;

            let point = poses.point(id.as_str())?;
            let d1 = euclidean_distance(point, poses.point(first.as_str())?);
            let d2 = euclidean_distance(point, poses.point(second.as_str())?);

            Ok((id.clone(), [(first.clone(), d1), (second.clone(), d2)]))
        })
        .collect()
}

/// Flag every pose whose true distance falls strictly outside the interval.
pub fn classify(true_distances: &DistanceMap, interval: &ConfidenceInterval) -> AnomalyFlags {
    true_distances
        .iter()
        .map(|(id, pair)| {
            let distance = representative_distance(pair);
            let anomalous = !interval.contains(distance);
            if anomalous {
                log::debug!("Image {id}: average distance to true neighbors {distance:.6}");
            }
            (id.clone(), anomalous)
        })
        .collect()
}
