use std::num::NonZeroUsize;

use kiddo::immutable::float::kdtree::ImmutableKdTree;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    collection::{NeighborMode, PoseCollection},
    distance::euclidean_distance,
    error::FilterError,
    id::{IdMap, ImageId},
    transforms::WorldPoint,
};

/// The two neighbors of every pose, keyed by image identifier.
pub type NeighborMap = IdMap<[ImageId; 2]>;

/// Strategy of the geometric nearest-neighbor search.
///
/// Every strategy returns the same neighbor map. Among equidistant
/// candidates the pose that comes first in the collection wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborSearch {
    /// Scan every other pose, O(n^2).
    #[default]
    Exhaustive,
    /// The exhaustive scan with poses distributed over the rayon thread pool.
    Parallel,
    /// Query a k-d tree built over the camera centers.
    #[serde(rename = "kdtree")]
    KdTree,
}

impl std::str::FromStr for NeighborSearch {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exhaustive" => Ok(Self::Exhaustive),
            "parallel" => Ok(Self::Parallel),
            "kdtree" => Ok(Self::KdTree),
            _ => Err(FilterError::InvalidParameter(format!(
                "unknown neighbor search strategy: {s}"
            ))),
        }
    }
}

/// Minimum number of poses that admits two distinct neighbors per pose.
const MIN_POSES: usize = 3;

/// The subject and its two neighbors.
const QUERY_SIZE: NonZeroUsize = NonZeroUsize::MIN.saturating_add(MIN_POSES - 1);

/// Find the two closest poses of every pose in the collection.
///
/// Geometric collections are searched by Euclidean distance between camera
/// centers using `search`. Sequential collections take the adjacent images
/// in capture order and ignore `search`.
///
/// # Arguments
///
/// * `collection` - The poses to search.
/// * `search` - The geometric search strategy.
///
/// # Returns
///
/// The neighbor map, in collection order.
///
/// Example:
///
/// ```
/// use camfilter_core::collection::PoseCollection;
/// use camfilter_core::neighbors::{find_neighbors, NeighborSearch};
///
/// let poses = PoseCollection::from_positions([
///     ("1.jpg", [0.0, 0.0, 0.0]),
///     ("2.jpg", [1.0, 0.0, 0.0]),
///     ("3.jpg", [3.0, 0.0, 0.0]),
/// ])
/// .unwrap();
/// let neighbors = find_neighbors(&poses, NeighborSearch::Exhaustive).unwrap();
/// let [first, second] = neighbors.get("3").unwrap();
/// assert_eq!((first.as_str(), second.as_str()), ("2", "1"));
/// ```
pub fn find_neighbors(
    collection: &PoseCollection,
    search: NeighborSearch,
) -> Result<NeighborMap, FilterError> {
    if collection.is_empty() {
        return Err(FilterError::EmptyCollection);
    }
    if collection.len() < MIN_POSES {
        return Err(FilterError::InsufficientData {
            required: MIN_POSES,
            actual: collection.len(),
        });
    }

    let ids = collection.ids().cloned().collect::<Vec<_>>();
    let pairs = match collection.mode() {
        NeighborMode::Sequential => sequential_neighbors(ids.len())?,
        NeighborMode::Geometric => {
            let points = collection.points()?;
            log::debug!(
                "Searching neighbors of {} poses with {:?} strategy",
                points.len(),
                search
            );
            geometric_neighbors(&points, search)?
        }
    };

    Ok(ids
        .iter()
        .zip(pairs)
        .map(|(id, [a, b])| (id.clone(), [ids[a].clone(), ids[b].clone()]))
        .collect())
}

fn geometric_neighbors(
    points: &[WorldPoint],
    search: NeighborSearch,
) -> Result<Vec<[usize; 2]>, FilterError> {
    let pairs = match search {
        NeighborSearch::Exhaustive => (0..points.len())
            .map(|i| nearest_two(points, i))
            .collect::<Vec<_>>(),
        NeighborSearch::Parallel => (0..points.len())
            .into_par_iter()
            .map(|i| nearest_two(points, i))
            .collect::<Vec<_>>(),
        NeighborSearch::KdTree => {
            // build kdtree over the camera centers, items are the positions
            let kdtree: ImmutableKdTree<f64, u64, 3, 32> = ImmutableKdTree::new_from_slice(points);
            (0..points.len())
                .map(|i| kdtree_nearest_two(&kdtree, points, i))
                .collect::<Vec<_>>()
        }
    };

    pairs
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or(FilterError::InsufficientData {
            required: MIN_POSES,
            actual: points.len(),
        })
}

/// Find the two points closest to `points[subject]`, skipping the subject.
///
/// Runs a two-slot running minimum over all other points. A candidate only
/// takes a slot when it is strictly closer, so the earlier point wins ties.
///
/// # Returns
///
/// The positions of the nearest and second nearest points, or `None` when
/// fewer than two other points exist.
pub fn nearest_two(points: &[WorldPoint], subject: usize) -> Option<[usize; 2]> {
    let query = points.get(subject)?;

    let mut first: Option<(f64, usize)> = None;
    let mut second: Option<(f64, usize)> = None;

    for (i, point) in points.iter().enumerate() {
        if i == subject {
            continue;
        }
        let distance = euclidean_distance(query, point);
        if first.map_or(true, |(best, _)| distance < best) {
            second = first;
            first = Some((distance, i));
        } else if second.map_or(true, |(best, _)| distance < best) {
            second = Some((distance, i));
        }
    }

    Some([first?.1, second?.1])
}

/// Query the two points closest to `points[subject]` in a k-d tree.
///
/// The tree only bounds the search radius. Every point within that radius is
/// then ranked by `(distance, position)`, so ties resolve like `nearest_two`.
fn kdtree_nearest_two(
    kdtree: &ImmutableKdTree<f64, u64, 3, 32>,
    points: &[WorldPoint],
    subject: usize,
) -> Option<[usize; 2]> {
    let query = points.get(subject)?;

    // the three closest items hold at least two points other than the subject
    let radius = kdtree
        .nearest_n::<kiddo::SquaredEuclidean>(query, QUERY_SIZE)
        .iter()
        .map(|nn| nn.distance)
        .fold(0.0, f64::max);

    // NOTE: widen the squared radius so rounding never drops a boundary point
    let mut candidates = kdtree
        .within_unsorted::<kiddo::SquaredEuclidean>(query, radius * (1.0 + 1e-9) + 1e-12)
        .into_iter()
        .map(|nn| nn.item as usize)
        .filter(|&i| i != subject)
        .map(|i| (euclidean_distance(query, &points[i]), i))
        .collect::<Vec<_>>();
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    match candidates[..] {
        [(_, first), (_, second), ..] => Some([first, second]),
        _ => None,
    }
}

/// Neighbors of a linear capture path of `len` poses, by position.
///
/// The first pose takes the two following poses, the last pose the two
/// preceding ones, and every interior pose its predecessor and successor.
pub fn sequential_neighbors(len: usize) -> Result<Vec<[usize; 2]>, FilterError> {
    if len < MIN_POSES {
        return Err(FilterError::InsufficientData {
            required: MIN_POSES,
            actual: len,
        });
    }

    Ok((0..len)
        .map(|i| match i {
            0 => [1, 2],
            i if i == len - 1 => [len - 3, len - 2],
            i => [i - 1, i + 1],
        })
        .collect())
}
