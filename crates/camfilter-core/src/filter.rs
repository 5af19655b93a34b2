use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    classifier::{classify, true_distances, AnomalyFlags},
    collection::PoseCollection,
    distance::{compute_distances, DistanceMap, Statistics},
    error::FilterError,
    id::ImageId,
    interval::ConfidenceInterval,
    neighbors::{find_neighbors, NeighborMap, NeighborSearch},
};

/// Parameters of a filter run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Confidence level of the acceptance interval, in (0, 1).
    ///
    /// Higher values widen the interval and retain more poses.
    pub softness: f64,
    /// Strategy of the geometric neighbor search.
    pub search: NeighborSearch,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            softness: 0.95,
            search: NeighborSearch::Exhaustive,
        }
    }
}

/// Neighbor graph of a pose collection with its distances and statistics.
///
/// The graph is derived from one collection value; narrowing a collection
/// yields a new value that needs a new graph.
#[derive(Debug, Clone)]
pub struct PoseGraph {
    /// The two neighbors of every pose.
    pub neighbors: NeighborMap,
    /// The distances to those neighbors.
    pub distances: DistanceMap,
    /// Statistics of the representative distances.
    pub statistics: Statistics,
}

impl PoseGraph {
    /// Search the neighbors of a geometric collection and measure them.
    pub fn build(collection: &PoseCollection, search: NeighborSearch) -> Result<Self, FilterError> {
        let neighbors = find_neighbors(collection, search)?;
        let (distances, statistics) = compute_distances(collection, &neighbors)?;
        Ok(Self {
            neighbors,
            distances,
            statistics,
        })
    }
}

/// Summary metrics of a filter run, meant for logging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FilterReport {
    /// Number of classified poses.
    pub total: usize,
    /// Number of anomalous poses.
    pub flagged: usize,
    /// Share of anomalous poses, in percent.
    pub percentage: f64,
    /// The acceptance interval.
    pub interval: ConfidenceInterval,
    /// Statistics of the reconstruction neighbor distances.
    pub statistics: Statistics,
}

/// Result of a filter run.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    /// Anomaly flag of every classified pose, in reconstruction order.
    pub flags: AnomalyFlags,
    /// Identifiers of the anomalous poses.
    pub flagged_ids: BTreeSet<ImageId>,
    /// Summary metrics.
    pub report: FilterReport,
}

impl FilterOutcome {
    /// Iterate over the poses that passed the filter, in reconstruction order.
    pub fn retained_ids(&self) -> impl Iterator<Item = &ImageId> {
        self.flags
            .iter()
            .filter(|(_, &flagged)| !flagged)
            .map(|(id, _)| id)
    }
}

/// Filter out the reconstruction poses that are misplaced relative to their neighbors.
///
/// With a passage, the reconstruction is first narrowed to the images the
/// passage references and the passage neighbors serve as ground truth.
/// Without one, the reconstruction is its own ground truth.
///
/// # Arguments
///
/// * `reconstruction` - The reconstruction poses.
/// * `passage` - Optional passage used as reference.
/// * `config` - The filter parameters.
///
/// # Returns
///
/// The anomaly flags of the (narrowed) reconstruction. Any failure aborts
/// the whole run.
///
/// Example:
///
/// ```
/// use camfilter_core::collection::PoseCollection;
/// use camfilter_core::filter::{run_filter, FilterConfig};
///
/// let poses = PoseCollection::from_positions(
///     (0..10).map(|i| (format!("ios_{i}.jpg"), [i as f64, 0.0, 0.0])),
/// )
/// .unwrap();
/// let outcome = run_filter(&poses, None, &FilterConfig::default()).unwrap();
/// assert_eq!(outcome.flags.len(), 10);
/// ```
pub fn run_filter(
    reconstruction: &PoseCollection,
    passage: Option<&PoseCollection>,
    config: &FilterConfig,
) -> Result<FilterOutcome, FilterError> {
    if !(config.softness > 0.0 && config.softness < 1.0) {
        return Err(FilterError::InvalidSoftness(config.softness));
    }

    let narrowed;
    let reconstruction = match passage {
        Some(passage) => {
            log::info!("Deleting images that are not part of the passage");
            narrowed = reconstruction.restrict_to(passage);
            log::info!(
                "{} images out of {} are part of the passage",
                narrowed.len(),
                reconstruction.len()
            );
            &narrowed
        }
        None => reconstruction,
    };

    let graph = PoseGraph::build(reconstruction, config.search)?;

    let passage_neighbors = passage
        .map(|passage| find_neighbors(passage, config.search))
        .transpose()?;

    let true_distances = true_distances(
        reconstruction,
        &graph.neighbors,
        &graph.distances,
        passage_neighbors.as_ref(),
    )?;

    let interval = ConfidenceInterval::from_statistics(&graph.statistics, config.softness)?;
    log::info!("Confidence interval: [{:.6}, {:.6}]", interval.lo, interval.hi);

    let flags = classify(&true_distances, &interval);
    let flagged_ids = flags
        .iter()
        .filter(|(_, &flagged)| flagged)
        .map(|(id, _)| id.clone())
        .collect::<BTreeSet<_>>();

    let total = flags.len();
    let report = FilterReport {
        total,
        flagged: flagged_ids.len(),
        percentage: flagged_ids.len() as f64 * 100.0 / total as f64,
        interval,
        statistics: graph.statistics,
    };
    log::info!(
        "{} cameras out of {} were filtered ({:.2} %)",
        report.flagged,
        report.total,
        report.percentage
    );

    Ok(FilterOutcome {
        flags,
        flagged_ids,
        report,
    })
}
