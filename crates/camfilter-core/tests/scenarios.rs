use std::collections::BTreeSet;

use approx::assert_relative_eq;
use camfilter_core::{
    collection::{Pose, PoseCollection},
    error::FilterError,
    filter::{run_filter, FilterConfig, PoseGraph},
    id::ImageId,
    neighbors::NeighborSearch,
    transforms::{colmap_coordinates, world_coordinates},
};

// two clusters of three cameras, 98 units apart
const CLUSTERS: [f64; 6] = [0.0, 1.0, 2.0, 100.0, 101.0, 102.0];

fn line_collection(xs: &[f64]) -> Result<PoseCollection, FilterError> {
    PoseCollection::from_positions(
        xs.iter()
            .enumerate()
            .map(|(i, &x)| (format!("p_{i}.jpg"), [x, 0.0, 0.0])),
    )
}

fn flagged(ids: &BTreeSet<ImageId>) -> Vec<&str> {
    ids.iter().map(ImageId::as_str).collect()
}

#[test]
fn reconstruction_only_keeps_regular_clusters() -> Result<(), FilterError> {
    let poses = line_collection(&CLUSTERS)?;
    let outcome = run_filter(&poses, None, &FilterConfig::default())?;

    assert_relative_eq!(outcome.report.statistics.mean, 4.0 / 3.0, epsilon = 1e-12);
    assert_relative_eq!(outcome.report.statistics.std, 0.235702, epsilon = 1e-6);
    assert_relative_eq!(outcome.report.interval.lo, 0.871365, epsilon = 1e-5);
    assert_relative_eq!(outcome.report.interval.hi, 1.795301, epsilon = 1e-5);
    assert!(outcome.flagged_ids.is_empty());
    assert_eq!(outcome.retained_ids().count(), 6);
    Ok(())
}

#[test]
fn sequential_passage_flags_the_gap() -> Result<(), FilterError> {
    let poses = line_collection(&CLUSTERS)?;
    let passage = PoseCollection::from_sequence((0..6).map(|i| format!("p_{i}.jpg")))?;

    for search in [
        NeighborSearch::Exhaustive,
        NeighborSearch::Parallel,
        NeighborSearch::KdTree,
    ] {
        let config = FilterConfig {
            search,
            ..Default::default()
        };
        let outcome = run_filter(&poses, Some(&passage), &config)?;
        assert_eq!(flagged(&outcome.flagged_ids), vec!["2", "3"]);
        assert_eq!(outcome.report.flagged, 2);
        assert_relative_eq!(outcome.report.percentage, 100.0 / 3.0, epsilon = 1e-9);
    }
    Ok(())
}

#[test]
fn passage_with_unregistered_images() -> Result<(), FilterError> {
    let poses = line_collection(&CLUSTERS)?;
    let passage = PoseCollection::from_sequence(
        ["p_0.jpg", "p_1.jpg", "p_99.jpg", "p_2.jpg", "p_3.jpg", "p_4.jpg", "p_5.jpg"],
    )?;

    let outcome = run_filter(&poses, Some(&passage), &FilterConfig::default())?;
    assert_eq!(outcome.report.total, 6);
    assert!(!outcome.flags.contains_key("99"));
    assert_eq!(flagged(&outcome.flagged_ids), vec!["2", "3"]);
    Ok(())
}

#[test]
fn isolated_camera_is_flagged() -> Result<(), FilterError> {
    let mut xs = CLUSTERS.to_vec();
    xs.push(50.0);
    let poses = line_collection(&xs)?;

    let outcome = run_filter(&poses, None, &FilterConfig::default())?;
    assert_eq!(flagged(&outcome.flagged_ids), vec!["6"]);

    let graph = PoseGraph::build(&poses, NeighborSearch::Exhaustive)?;
    let [(first, d1), (second, d2)] = graph.distances.get("6").expect("isolated camera");
    assert_eq!((first.as_str(), second.as_str()), ("2", "1"));
    assert_relative_eq!(*d1, 48.0);
    assert_relative_eq!(*d2, 49.0);
    Ok(())
}

#[test]
fn softness_is_monotonic() -> Result<(), FilterError> {
    let mut xs = CLUSTERS.to_vec();
    xs.extend([50.0, 20.0, 21.5]);
    let poses = line_collection(&xs)?;

    let mut previous = usize::MAX;
    for softness in [0.5, 0.8, 0.85, 0.9, 0.95, 0.99] {
        let config = FilterConfig {
            softness,
            ..Default::default()
        };
        let outcome = run_filter(&poses, None, &config)?;
        assert!(outcome.report.flagged <= previous);
        previous = outcome.report.flagged;
    }
    Ok(())
}

#[test]
fn evenly_spaced_line() -> Result<(), FilterError> {
    let xs = (0..10).map(|i| i as f64).collect::<Vec<_>>();
    let poses = line_collection(&xs)?;

    // the two ends see their neighbors at 1 and 2, the interior at 1 and 1
    let strict = FilterConfig {
        softness: 0.95,
        ..Default::default()
    };
    let outcome = run_filter(&poses, None, &strict)?;
    assert_eq!(flagged(&outcome.flagged_ids), vec!["0", "9"]);

    let soft = FilterConfig {
        softness: 0.99,
        ..Default::default()
    };
    let outcome = run_filter(&poses, None, &soft)?;
    assert!(outcome.flagged_ids.is_empty());
    Ok(())
}

#[test]
fn rotated_cameras_match_positions() -> Result<(), FilterError> {
    let mut xs = CLUSTERS.to_vec();
    xs.push(50.0);

    let rotations = [
        [1.0, 0.0, 0.0, 0.0],
        [0.7071067811865476, 0.7071067811865476, 0.0, 0.0],
        [0.5, 0.5, 0.5, 0.5],
        [0.0, 0.0, 1.0, 0.0],
        [0.9238795325112867, 0.0, 0.0, 0.3826834323650898],
    ];
    let images = xs
        .iter()
        .enumerate()
        .map(|(i, &x)| {
            let q = rotations[i % rotations.len()];
            let t = colmap_coordinates(&q, &[x, 1.0, -2.0])?;
            Ok((format!("ios_{i}.jpg"), Pose::new(q, t)))
        })
        .collect::<Result<Vec<_>, FilterError>>()?;

    for (i, (_, pose)) in images.iter().enumerate() {
        let point = world_coordinates(&pose.rotation, &pose.translation)?;
        assert_relative_eq!(point[0], xs[i], epsilon = 1e-9);
        assert_relative_eq!(point[1], 1.0, epsilon = 1e-9);
        assert_relative_eq!(point[2], -2.0, epsilon = 1e-9);
    }

    let poses = PoseCollection::from_poses(images)?;
    let outcome = run_filter(&poses, None, &FilterConfig::default())?;
    assert_eq!(flagged(&outcome.flagged_ids), vec!["6"]);
    Ok(())
}

#[test]
fn constant_distance_is_never_flagged() -> Result<(), FilterError> {
    // square: both nearest neighbors of every corner are adjacent corners
    let poses = PoseCollection::from_positions([
        ("s_1.jpg", [0.0, 0.0, 0.0]),
        ("s_2.jpg", [3.0, 0.0, 0.0]),
        ("s_3.jpg", [3.0, 3.0, 0.0]),
        ("s_4.jpg", [0.0, 3.0, 0.0]),
    ])?;

    for softness in [0.01, 0.5, 0.95, 0.999] {
        let config = FilterConfig {
            softness,
            ..Default::default()
        };
        let outcome = run_filter(&poses, None, &config)?;
        assert_eq!(outcome.report.statistics.mean, 3.0);
        assert_eq!(outcome.report.statistics.std, 0.0);
        assert!(outcome.flagged_ids.is_empty());
    }
    Ok(())
}

#[test]
fn constant_inexact_distance_is_never_flagged() -> Result<(), FilterError> {
    // cube of side 0.1: a summed mean of 0.1 is not exactly 0.1
    let corners = (0..8)
        .map(|i| {
            let corner = [i & 1, (i >> 1) & 1, (i >> 2) & 1].map(|c| c as f64 * 0.1);
            (format!("c_{i}.jpg"), corner)
        })
        .collect::<Vec<_>>();
    let poses = PoseCollection::from_positions(corners)?;

    for softness in [0.01, 0.3, 0.5, 0.95] {
        let config = FilterConfig {
            softness,
            ..Default::default()
        };
        let outcome = run_filter(&poses, None, &config)?;
        assert_eq!(outcome.report.statistics.mean, 0.1);
        assert_eq!(outcome.report.statistics.std, 0.0);
        assert!(outcome.flagged_ids.is_empty());
    }
    Ok(())
}

#[test]
fn geometric_passage_decides_the_neighbors() -> Result<(), FilterError> {
    let xs = (0..10).map(|i| i as f64).collect::<Vec<_>>();
    let poses = line_collection(&xs)?;
    let config = FilterConfig {
        softness: 0.99,
        ..Default::default()
    };

    // the reconstruction alone and its capture order agree on every camera
    let outcome = run_filter(&poses, None, &config)?;
    assert!(outcome.flagged_ids.is_empty());
    let sequence = PoseCollection::from_sequence((0..10).map(|i| format!("p_{i}.jpg")))?;
    let outcome = run_filter(&poses, Some(&sequence), &config)?;
    assert!(outcome.flagged_ids.is_empty());

    // the measured passage places cameras 2 and 7 at each other's spot
    let passage = PoseCollection::from_positions((0..10).map(|i| {
        let x = match i {
            2 => 7.0,
            7 => 2.0,
            i => i as f64,
        };
        (format!("p_{i}.jpg"), [x, 0.0, 0.0])
    }))?;

    for search in [
        NeighborSearch::Exhaustive,
        NeighborSearch::Parallel,
        NeighborSearch::KdTree,
    ] {
        let config = FilterConfig {
            search,
            ..config.clone()
        };
        let outcome = run_filter(&poses, Some(&passage), &config)?;

        // only 4 and 5 keep both passage neighbors adjacent in the reconstruction
        assert_eq!(
            flagged(&outcome.flagged_ids),
            vec!["0", "1", "2", "3", "6", "7", "8", "9"]
        );
        assert_eq!(outcome.report.total, 10);
        assert_relative_eq!(outcome.report.statistics.mean, 1.1, epsilon = 1e-12);
        assert_relative_eq!(outcome.report.statistics.std, 0.2, epsilon = 1e-12);
    }
    Ok(())
}
