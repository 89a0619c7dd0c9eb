//! Balanced two-way clustering of carrier positions.
//!
//! A k-means relocation with k = 2, restricted to partitions whose groups
//! hold between `floor(n/2)` and `ceil(n/2)` members. Converged partitions
//! that break the bound are thrown away and both candidate centres are
//! re-drawn uniformly inside the enclosing sphere. After `relax_after`
//! rejections the lower bound drops to the largest minority group seen so
//! far; after `fallback_after` rejections, or when the relaxed bound would
//! accept an empty group, the points are halved along their widest axis.

use std::f64::consts::{PI, TAU};

use glam::DVec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::Sphere;

/// Relocation passes allowed per seeding before the partition is judged as is.
const MAX_RELOCATION_PASSES: u32 = 256;

/// Balanced two-means splitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancedSplit {
    /// Rejected partitions tolerated before the balance bound is relaxed
    pub relax_after: u32,
    /// Rejected partitions tolerated before halving along the widest axis
    pub fallback_after: u32,
}

impl Default for BalancedSplit {
    fn default() -> Self {
        Self {
            relax_after: 1000,
            fallback_after: 10_000,
        }
    }
}

/// Result of splitting a point set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutcome {
    /// Indices into the input slice, one group per candidate centre
    pub groups: [Vec<usize>; 2],
    /// Converged partitions rejected before acceptance
    pub rejected: u32,
    /// The accepted partition was judged against a relaxed bound
    pub relaxed: bool,
    /// The partition came from the widest-axis halving
    pub fallback: bool,
}

impl SplitOutcome {
    /// Size of the smaller group.
    #[must_use]
    pub fn minority(&self) -> usize {
        self.groups[0].len().min(self.groups[1].len())
    }
}

/// Draw a point uniformly inside `sphere`.
pub fn sample_in_sphere<R: Rng + ?Sized>(sphere: &Sphere, rng: &mut R) -> DVec3 {
    let r = sphere.radius * rng.gen::<f64>().cbrt();
    let theta = PI * rng.gen::<f64>();
    let phi = TAU * rng.gen::<f64>();
    sphere.center
        + DVec3::new(
            r * theta.sin() * phi.cos(),
            r * theta.sin() * phi.sin(),
            r * theta.cos(),
        )
}

/// Assign every point to its nearest centre; returns how many assignments changed.
fn assign(points: &[DVec3], centers: &[DVec3; 2], assignment: &mut [Option<usize>]) -> usize {
    let mut moved = 0;
    for (point, slot) in points.iter().zip(assignment.iter_mut()) {
        // Strict comparison keeps ties on the lower candidate index
        let nearest = if point.distance_squared(centers[1]) < point.distance_squared(centers[0]) {
            1
        } else {
            0
        };
        if *slot != Some(nearest) {
            *slot = Some(nearest);
            moved += 1;
        }
    }
    moved
}

fn group_sizes(assignment: &[Option<usize>]) -> [usize; 2] {
    let mut sizes = [0, 0];
    for j in assignment.iter().flatten() {
        sizes[*j] += 1;
    }
    sizes
}

fn recenter(points: &[DVec3], assignment: &[Option<usize>], centers: &mut [DVec3; 2]) {
    let mut sums = [DVec3::ZERO; 2];
    let mut counts = [0usize; 2];
    for (point, j) in points.iter().zip(assignment) {
        if let Some(j) = j {
            sums[*j] += *point;
            counts[*j] += 1;
        }
    }
    for j in 0..2 {
        if counts[j] > 1 {
            #[allow(clippy::cast_precision_loss)]
            let mean = sums[j] / counts[j] as f64;
            centers[j] = mean;
        }
    }
}

/// Halve the points along the axis of largest spread.
fn halve_along_widest_axis(points: &[DVec3]) -> [Vec<usize>; 2] {
    let (min, max) = points.iter().fold(
        (DVec3::splat(f64::INFINITY), DVec3::splat(f64::NEG_INFINITY)),
        |(lo, hi), p| (lo.min(*p), hi.max(*p)),
    );
    let spread = max - min;
    let axis = if spread.x >= spread.y && spread.x >= spread.z {
        0
    } else if spread.y >= spread.z {
        1
    } else {
        2
    };

    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&a, &b| points[a][axis].total_cmp(&points[b][axis]).then(a.cmp(&b)));
    let second = order.split_off(points.len() / 2);
    [order, second]
}

impl BalancedSplit {
    /// Create a splitter with explicit retry limits.
    #[must_use]
    pub fn new(relax_after: u32, fallback_after: u32) -> Self {
        Self {
            relax_after,
            fallback_after,
        }
    }

    /// Split `points` into two balanced groups.
    ///
    /// `enclosing` is the sphere candidate centres are drawn from. Inputs of
    /// fewer than two points yield a single (possibly empty) first group.
    pub fn split<R: Rng + ?Sized>(
        &self,
        points: &[DVec3],
        enclosing: &Sphere,
        rng: &mut R,
    ) -> SplitOutcome {
        let n = points.len();
        if n <= 2 {
            let mut first: Vec<usize> = (0..n).collect();
            let second = first.split_off(n.min(1));
            return SplitOutcome {
                groups: [first, second],
                rejected: 0,
                relaxed: false,
                fallback: false,
            };
        }

        let mut lower = n / 2;
        let mut best_minority = 0;
        let mut rejected = 0u32;
        let mut relaxed = false;

        let mut centers = [
            sample_in_sphere(enclosing, rng),
            sample_in_sphere(enclosing, rng),
        ];
        let mut assignment = vec![None; n];
        let mut passes = 0u32;

        loop {
            let moved = assign(points, &centers, &mut assignment);
            passes += 1;
            if moved > 0 && passes < MAX_RELOCATION_PASSES {
                recenter(points, &assignment, &mut centers);
                continue;
            }

            let sizes = group_sizes(&assignment);
            let minority = sizes[0].min(sizes[1]);
            // Both groups within [lower, n - lower] is the same as the minority reaching `lower`
            if minority >= lower {
                if minority == 0 {
                    break;
                }
                let mut groups = [Vec::with_capacity(sizes[0]), Vec::with_capacity(sizes[1])];
                for (i, j) in assignment.iter().enumerate() {
                    if let Some(j) = j {
                        groups[*j].push(i);
                    }
                }
                return SplitOutcome {
                    groups,
                    rejected,
                    relaxed,
                    fallback: false,
                };
            }

            rejected += 1;
            best_minority = best_minority.max(minority);
            if rejected >= self.fallback_after {
                break;
            }
            if rejected > self.relax_after {
                lower = best_minority;
                relaxed = true;
            }
            centers = [
                sample_in_sphere(enclosing, rng),
                sample_in_sphere(enclosing, rng),
            ];
            passes = 0;
            assignment.fill(None);
        }

        SplitOutcome {
            groups: halve_along_widest_axis(points),
            rejected,
            relaxed: true,
            fallback: true,
        }
    }
}
