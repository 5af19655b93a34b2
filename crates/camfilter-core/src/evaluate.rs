//! Synthetic evaluation of the filter.
//!
//! Random camera centers of a reconstruction are displaced with Gaussian
//! noise and the filter is scored on how well it recovers them.

use std::{collections::HashSet, f64::consts::PI};

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    classifier::AnomalyFlags,
    collection::{Pose, PoseCollection},
    error::FilterError,
    filter::{run_filter, FilterConfig},
    id::{extract_identifier, ImageId},
    transforms::add_vector,
};

/// Parameters of the synthetic pose perturbation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerturbationParams {
    /// Probability of displacing each camera.
    pub probability: f64,
    /// Standard deviation of the displacement along each world axis.
    pub noise_scale: f64,
    /// Optional fixed seed for reproducible sampling.
    pub random_seed: Option<u64>,
}

impl Default for PerturbationParams {
    fn default() -> Self {
        Self {
            probability: 0.15,
            noise_scale: 1.0,
            random_seed: None,
        }
    }
}

/// Parameters of an evaluation campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationParams {
    /// Filter parameters used in every trial.
    pub filter: FilterConfig,
    /// Number of perturb-and-filter trials.
    pub trials: usize,
    /// Perturbation applied before every trial.
    pub perturbation: PerturbationParams,
}

impl Default for EvaluationParams {
    fn default() -> Self {
        Self {
            filter: FilterConfig {
                softness: 0.85,
                ..Default::default()
            },
            trials: 5,
            perturbation: PerturbationParams::default(),
        }
    }
}

/// Draw a sample of `N(0, std^2)` with the Box-Muller transform.
fn sample_gaussian<R: Rng + ?Sized>(rng: &mut R, std: f64) -> f64 {
    // u1 in (0, 1) to avoid ln(0)
    let u1 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos() * std
}

/// Displace random camera centers with world-space Gaussian noise.
///
/// # Arguments
///
/// * `poses` - The poses to perturb in place.
/// * `params` - The perturbation parameters; the seed is ignored, use `rng`.
/// * `rng` - The random number generator.
///
/// # Returns
///
/// The positions of the displaced poses.
pub fn perturb_poses<R: Rng + ?Sized>(
    poses: &mut [Pose],
    params: &PerturbationParams,
    rng: &mut R,
) -> Result<Vec<usize>, FilterError> {
    if !(0.0..=1.0).contains(&params.probability) {
        return Err(FilterError::InvalidParameter(format!(
            "probability must lie in [0, 1], got {}",
            params.probability
        )));
    }
    if !(params.noise_scale.is_finite() && params.noise_scale >= 0.0) {
        return Err(FilterError::InvalidParameter(format!(
            "noise scale must be finite and non-negative, got {}",
            params.noise_scale
        )));
    }

    let mut perturbed = Vec::new();
    for (i, pose) in poses.iter_mut().enumerate() {
        if !rng.random_bool(params.probability) {
            continue;
        }
        let delta = [
            sample_gaussian(rng, params.noise_scale),
            sample_gaussian(rng, params.noise_scale),
            sample_gaussian(rng, params.noise_scale),
        ];
        pose.translation = add_vector(&pose.rotation, &pose.translation, &delta)?;
        perturbed.push(i);
    }

    log::info!(
        "{} poses out of {} were perturbed ({:.1} %)",
        perturbed.len(),
        poses.len(),
        perturbed.len() as f64 * 100.0 / poses.len().max(1) as f64
    );

    Ok(perturbed)
}

/// Classification scores of a filter run against known perturbations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    /// Share of flagged poses that were perturbed.
    pub precision: f64,
    /// Share of perturbed poses that were flagged.
    pub recall: f64,
    /// Harmonic mean of precision and recall.
    pub f1: f64,
}

impl Scores {
    /// Average a set of scores, zero when empty.
    pub fn mean(scores: &[Scores]) -> Scores {
        if scores.is_empty() {
            return Scores::default();
        }
        let n = scores.len() as f64;
        Scores {
            precision: scores.iter().map(|s| s.precision).sum::<f64>() / n,
            recall: scores.iter().map(|s| s.recall).sum::<f64>() / n,
            f1: scores.iter().map(|s| s.f1).sum::<f64>() / n,
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    match denominator {
        0 => 0.0,
        d => numerator as f64 / d as f64,
    }
}

/// Score the anomaly flags against the set of perturbed images.
///
/// Only the classified images are considered; undefined ratios score zero.
pub fn score(flags: &AnomalyFlags, perturbed: &HashSet<ImageId>) -> Scores {
    let (mut tp, mut fp, mut fn_) = (0, 0, 0);
    for (id, &flagged) in flags.iter() {
        match (flagged, perturbed.contains(id)) {
            (true, true) => tp += 1,
            (true, false) => fp += 1,
            (false, true) => fn_ += 1,
            (false, false) => {}
        }
    }

    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = match precision + recall {
        sum if sum > 0.0 => 2.0 * precision * recall / sum,
        _ => 0.0,
    };

    Scores {
        precision,
        recall,
        f1,
    }
}

/// Run repeated perturb-and-filter trials and average the scores.
///
/// # Arguments
///
/// * `images` - The reconstruction as pairs of image file name and pose.
/// * `passage` - Optional passage used as reference by the filter.
/// * `params` - The evaluation parameters.
pub fn evaluate(
    images: &[(String, Pose)],
    passage: Option<&PoseCollection>,
    params: &EvaluationParams,
) -> Result<Scores, FilterError> {
    let mut rng = match params.perturbation.random_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut scores = Vec::with_capacity(params.trials);
    for trial in 0..params.trials {
        let mut poses = images.iter().map(|(_, pose)| *pose).collect::<Vec<_>>();
        let perturbed = perturb_poses(&mut poses, &params.perturbation, &mut rng)?
            .into_iter()
            .map(|i| extract_identifier(&images[i].0))
            .collect::<Result<HashSet<_>, _>>()?;

        let collection = PoseCollection::from_poses(
            images.iter().zip(poses).map(|((name, _), pose)| (name, pose)),
        )?;
        let outcome = run_filter(&collection, passage, &params.filter)?;
        if outcome.flagged_ids.is_empty() {
            log::warn!("Trial {trial}: no camera was flagged");
        }

        let trial_scores = score(&outcome.flags, &perturbed);
        log::debug!("Trial {trial}: {trial_scores:?}");
        scores.push(trial_scores);
    }

    let mean = Scores::mean(&scores);
    log::info!(
        "Average precision: {:.4}, recall: {:.4}, F1: {:.4}",
        mean.precision,
        mean.recall,
        mean.f1
    );
    Ok(mean)
}
