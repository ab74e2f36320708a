//! Survey statistics.
//!
//! A result vector is split into three equal groups of answers: knowledge,
//! familiarity and cognitive load. Each group is summarized by its mean and
//! mode, and by a Gaussian density curve centred on the mean.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::types::{AnalysisGraphs, DensityPoint, DimensionStats, VoxelAnalysis, VoxelPoint};

/// Lowest answer on the survey scale.
pub const SCALE_MIN: f64 = 1.0;
/// Highest answer on the survey scale.
pub const SCALE_MAX: f64 = 8.0;
/// Samples per density curve: 1.0 to 8.0 inclusive in steps of 0.1.
pub const CURVE_POINTS: usize = 71;
const CURVE_STEP: f64 = 0.1;
const CURVE_STD_DEV: f64 = 1.0;

const DIMENSIONS: usize = 3;

/// Checks that a result vector can be split into the three dimensions and
/// returns the number of answers per dimension.
pub fn group_size(results: &[f64]) -> Result<usize> {
    if results.is_empty() {
        return Err(Error::bad_request("Survey results cannot be empty"));
    }
    if results.len() % DIMENSIONS != 0 {
        return Err(Error::bad_request(format!(
            "Survey results must split into {DIMENSIONS} equal groups, got {} values",
            results.len()
        )));
    }
    if results.iter().any(|v| !v.is_finite()) {
        return Err(Error::bad_request("Survey results must be finite numbers"));
    }
    Ok(results.len() / DIMENSIONS)
}

/// Element-wise arithmetic mean of equally weighted vectors.
pub fn average(vectors: &[Vec<f64>]) -> Result<Vec<f64>> {
    let Some(first) = vectors.first() else {
        return Err(Error::bad_request("No survey results to average"));
    };
    let len = first.len();

    if let Some(bad) = vectors.iter().find(|v| v.len() != len) {
        return Err(Error::bad_request(format!(
            "Survey results have mismatched lengths ({len} and {})",
            bad.len()
        )));
    }

    let count = vectors.len() as f64;
    let mut sums = vec![0.0; len];
    for vector in vectors {
        for (sum, value) in sums.iter_mut().zip(vector) {
            *sum += value;
        }
    }

    Ok(sums.into_iter().map(|sum| sum / count).collect())
}

/// Rounds every element up, the form in which averaged results are stored.
#[must_use]
pub fn round_up(values: &[f64]) -> Vec<f64> {
    values.iter().map(|v| v.ceil()).collect()
}

#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Most frequent value after rounding each element to the nearest integer.
/// Ties go to the smallest value.
#[must_use]
pub fn mode(values: &[f64]) -> f64 {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value.round() as i64).or_default() += 1;
    }

    let mut best: Option<(i64, usize)> = None;
    for (value, count) in counts {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }

    best.map_or(0.0, |(value, _)| value as f64)
}

fn dimension_stats(values: &[f64]) -> DimensionStats {
    DimensionStats {
        mean: mean(values),
        mode: mode(values),
    }
}

fn scale_position(mean: f64) -> i64 {
    mean.clamp(SCALE_MIN, SCALE_MAX).round() as i64
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn gaussian_pdf(x: f64, mean: f64, std_dev: f64) -> f64 {
    let z = (x - mean) / std_dev;
    (-0.5 * z * z).exp() / (std_dev * (2.0 * std::f64::consts::PI).sqrt())
}

/// Normal density with the given mean sampled across the answer scale.
#[must_use]
pub fn density_curve(mean: f64) -> Vec<DensityPoint> {
    (0..CURVE_POINTS)
        .map(|i| {
            let x = round_to(SCALE_MIN + i as f64 * CURVE_STEP, 1);
            DensityPoint {
                x,
                y: round_to(gaussian_pdf(x, mean, CURVE_STD_DEV), 4),
            }
        })
        .collect()
}

/// Computes the voxel summary and density curves for one result vector.
pub fn analyze(results: &[f64]) -> Result<(VoxelAnalysis, AnalysisGraphs)> {
    let size = group_size(results)?;
    let knowledge = dimension_stats(&results[..size]);
    let familiarity = dimension_stats(&results[size..2 * size]);
    let cognitive_load = dimension_stats(&results[2 * size..]);

    let voxel = VoxelAnalysis {
        knowledge,
        familiarity,
        cognitive_load,
        voxel: VoxelPoint {
            x: scale_position(knowledge.mean),
            y: scale_position(familiarity.mean),
            z: scale_position(cognitive_load.mean),
        },
    };

    let graphs = AnalysisGraphs {
        knowledge: density_curve(knowledge.mean),
        familiarity: density_curve(familiarity.mean),
        cognitive_load: density_curve(cognitive_load.mean),
    };

    Ok((voxel, graphs))
}

/// The averaged vector of several surveys, as stored (rounded up) and as
/// analyzed (unrounded).
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub stored_results: Vec<f64>,
    pub analysis_voxel: VoxelAnalysis,
    pub analysis_graphs: AnalysisGraphs,
}

pub fn aggregate(vectors: &[Vec<f64>]) -> Result<Aggregate> {
    let averaged = average(vectors)?;
    let (analysis_voxel, analysis_graphs) = analyze(&averaged)?;

    Ok(Aggregate {
        stored_results: round_up(&averaged),
        analysis_voxel,
        analysis_graphs,
    })
}
