use std::io::{self, Write};

use indicatif::ProgressBar;
use rand::Rng;
use rayon::prelude::*;

use crate::solver::{Actuator, Angles, KinematicsSolver};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub vertical_offset: f64,
    pub tilt_x: f64,
    pub tilt_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub pose: Pose,
    pub angles: Angles,
}

fn linspace(from: f64, to: f64, steps: usize) -> impl Iterator<Item = f64> {
    let span = if steps > 1 { (to - from) / ((steps - 1) as f64) } else { 0.0 };
    return (0..steps).map(move |i| from + span * (i as f64));
}

/// Upper bound on the number of poses a single sweep may generate.
pub const MAX_POSES: usize = 10_000_000;

fn check_bounds(heights: (f64, f64), tilt_limit: f64) -> anyhow::Result<()> {
    if !heights.0.is_finite() || !heights.1.is_finite() {
        anyhow::bail!("height range must be finite, got {} .. {}", heights.0, heights.1);
    }
    if !tilt_limit.is_finite() {
        anyhow::bail!("tilt limit must be finite, got {}", tilt_limit);
    }
    return Ok(());
}

/// Regular grid over `heights` and the square `[-tilt_limit, tilt_limit]²`,
/// `steps` points per axis.
pub fn pose_grid(heights: (f64, f64), tilt_limit: f64, steps: usize) -> anyhow::Result<Vec<Pose>> {
    check_bounds(heights, tilt_limit)?;

    let count = steps
        .checked_mul(steps)
        .and_then(|n| n.checked_mul(steps))
        .filter(|n| *n <= MAX_POSES)
        .ok_or_else(|| anyhow::anyhow!("{} steps per axis exceeds the limit of {} poses", steps, MAX_POSES))?;

    let tilt_limit = tilt_limit.abs();
    let mut output = Vec::with_capacity(count);

    for vertical_offset in linspace(heights.0, heights.1, steps) {
        for tilt_x in linspace(-tilt_limit, tilt_limit, steps) {
            for tilt_y in linspace(-tilt_limit, tilt_limit, steps) {
                output.push(Pose {
                    vertical_offset,
                    tilt_x,
                    tilt_y,
                });
            }
        }
    }

    return Ok(output);
}

/// Uniformly random poses. Height bounds may be given in either order and the
/// tilt limit is taken by magnitude.
pub fn sample_poses<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    heights: (f64, f64),
    tilt_limit: f64,
) -> anyhow::Result<Vec<Pose>> {
    check_bounds(heights, tilt_limit)?;
    if count > MAX_POSES {
        anyhow::bail!("{} random poses exceeds the limit of {}", count, MAX_POSES);
    }

    let (low, high) = (heights.0.min(heights.1), heights.0.max(heights.1));
    let tilt_limit = tilt_limit.abs();

    let poses = (0..count)
        .map(|_| Pose {
            vertical_offset: rng.gen_range(low..=high),
            tilt_x: rng.gen_range(-tilt_limit..=tilt_limit),
            tilt_y: rng.gen_range(-tilt_limit..=tilt_limit),
        })
        .collect();

    return Ok(poses);
}

/// Solve every pose in parallel. The progress bar, if any, ticks once per pose.
pub fn evaluate(solver: &KinematicsSolver, poses: &[Pose], bar: Option<&ProgressBar>) -> Vec<Sample> {
    let samples = poses.par_iter().map(|pose| {
        let angles = solver.compute_angles(pose.vertical_offset, pose.tilt_x, pose.tilt_y);
        if let Some(bar) = bar {
            bar.inc(1);
        }
        return Sample { pose: *pose, angles };
    });

    return samples.collect();
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub reachable: usize,
    pub unreachable: usize,
    ranges: [Option<AngleRange>; 3],
}

impl Summary {
    /// Only poses with all three angles finite contribute to the ranges.
    pub fn from_samples(samples: &[Sample]) -> Self {
        let mut summary = Self {
            reachable: 0,
            unreachable: 0,
            ranges: [None; 3],
        };

        for sample in samples {
            if !sample.angles.is_finite() {
                summary.unreachable += 1;
                continue;
            }

            summary.reachable += 1;
            for (actuator, angle) in sample.angles.iter() {
                let i = actuator.index();
                summary.ranges[i] = Some(match summary.ranges[i] {
                    Some(range) => AngleRange {
                        min: range.min.min(angle),
                        max: range.max.max(angle),
                    },
                    None => AngleRange { min: angle, max: angle },
                });
            }
        }

        return summary;
    }

    pub fn range(&self, actuator: Actuator) -> Option<AngleRange> {
        return self.ranges[actuator.index()];
    }

    pub fn total(&self) -> usize {
        return self.reachable + self.unreachable;
    }
}

pub fn write_csv<W: Write>(writer: &mut W, samples: &[Sample]) -> io::Result<()> {
    writeln!(writer, "vertical_offset,tilt_x,tilt_y,x,y,z")?;
    for sample in samples {
        writeln!(
            writer,
            "{},{},{},{},{},{}",
            sample.pose.vertical_offset,
            sample.pose.tilt_x,
            sample.pose.tilt_y,
            sample.angles.x,
            sample.angles.y,
            sample.angles.z
        )?;
    }

    return Ok(());
}
