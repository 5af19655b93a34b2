use serde::{Deserialize, Serialize};

use crate::{
    collection::PoseCollection,
    error::FilterError,
    id::{IdMap, ImageId},
    neighbors::NeighborMap,
    transforms::WorldPoint,
};

/// Distances from every pose to its two neighbors, keyed by image identifier.
pub type DistanceMap = IdMap<[(ImageId, f64); 2]>;

/// Utility function to compute the Euclidean distance between two points.
///
/// # Arguments
///
/// * `a` - A point in 3D space.
/// * `b` - Another point in 3D space.
///
/// # Returns
///
/// The Euclidean distance between the two points.
///
/// Example:
/// ```
/// use camfilter_core::distance::euclidean_distance;
///
/// let a = [1.0, 2.0, 3.0];
/// let b = [4.0, 6.0, 3.0];
/// assert_eq!(euclidean_distance(&a, &b), 5.0);
/// ```
pub fn euclidean_distance(a: &WorldPoint, b: &WorldPoint) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt()
}

/// Mean of the two neighbor distances, the representative distance of a pose.
#[inline]
pub fn representative_distance(distances: &[(ImageId, f64); 2]) -> f64 {
    (distances[0].1 + distances[1].1) / 2.0
}

/// Population statistics of the representative neighbor distances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Mean of the representative distances.
    pub mean: f64,
    /// Population standard deviation of the representative distances.
    pub std: f64,
}

impl Statistics {
    /// Compute the population mean and standard deviation of the samples.
    ///
    /// The deviation is not Bessel-corrected. Identical samples give their
    /// common value and a zero deviation exactly.
    pub fn from_samples(samples: &[f64]) -> Result<Self, FilterError> {
        let Some(&first) = samples.first() else {
            return Err(FilterError::EmptyCollection);
        };

        // the summed mean of constant samples may be off by one ulp
        if samples.iter().all(|&x| x == first) {
            return Ok(Self {
                mean: first,
                std: 0.0,
            });
        }

        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

        Ok(Self {
            mean,
            std: variance.sqrt(),
        })
    }
}

/// Compute the distances to the neighbors of every pose and their statistics.
///
/// # Arguments
///
/// * `collection` - A geometric pose collection.
/// * `neighbors` - The neighbor map of the collection.
///
/// # Returns
///
/// The distance map, in collection order, and the statistics of the
/// representative distances.
pub fn compute_distances(
    collection: &PoseCollection,
    neighbors: &NeighborMap,
) -> Result<(DistanceMap, Statistics), FilterError> {
    let mut distances = DistanceMap::with_capacity(collection.len());
    let mut representative = Vec::with_capacity(collection.len());

    for id in collection.ids() {
        let [first, second] = neighbors
            .get(id.as_str())
            .ok_or_else(|| FilterError::UnknownIdentifier(id.clone()))?;

        let point = collection.point(id.as_str())?;
        let d1 = euclidean_distance(point, collection.point(first.as_str())?);
        let d2 = euclidean_distance(point, collection.point(second.as_str())?);

        let pair = [(first.clone(), d1), (second.clone(), d2)];
        representative.push(representative_distance(&pair));
        distances.insert(id.clone(), pair);
    }

    let statistics = Statistics::from_samples(&representative)?;

    log::info!(
        "Average neighbor distance: {:.6}, standard deviation: {:.6}",
        statistics.mean,
        statistics.std
    );

    Ok((distances, statistics))
}
