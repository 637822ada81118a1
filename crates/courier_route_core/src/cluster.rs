//! Geographic grouping of stops with seeded k-means.

use std::panic::{AssertUnwindSafe, catch_unwind};

use linfa::prelude::*;
use linfa_clustering::KMeans;
use ndarray::Array2;
use rand_xoshiro::{Xoshiro256Plus, rand_core::SeedableRng};

use crate::{
    Coordinate, Error, Result,
    constants::{
        DEFAULT_CLUSTER_MAX_ITERATIONS, DEFAULT_CLUSTER_RESTARTS, DEFAULT_CLUSTER_SEED,
        DEFAULT_CLUSTER_TOLERANCE, STOPS_PER_CLUSTER,
    },
};

/// Seeded, restartable k-means over raw `(lat, lng)` pairs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClusterAssigner {
    pub seed: u64,
    pub restarts: usize,
    pub max_iterations: u64,
    pub tolerance: f64,
}

impl Default for ClusterAssigner {
    fn default() -> Self {
        Self {
            seed: DEFAULT_CLUSTER_SEED,
            restarts: DEFAULT_CLUSTER_RESTARTS,
            max_iterations: DEFAULT_CLUSTER_MAX_ITERATIONS,
            tolerance: DEFAULT_CLUSTER_TOLERANCE,
        }
    }
}

impl ClusterAssigner {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts.max(1);
        self
    }

    /// One label per point. `k` of `None` or `Some(0)` targets about eight
    /// stops per cluster. When `k` reaches the point count every point gets
    /// its own increasing label. Labels are numbered in order of first
    /// appearance so equal partitions always read the same.
    #[courier_route_derive::timer("cluster.assign")]
    pub fn assign(&self, points: &[Coordinate], k: Option<usize>) -> Result<Vec<usize>> {
        let n = points.len();
        if n == 0 {
            return Ok(Vec::new());
        }

        let k = match k {
            Some(k) if k > 0 => k,
            _ => auto_cluster_count(n),
        };
        if k >= n {
            log::debug!("cluster: identity n={n} k={k}");
            return Ok((0..n).collect());
        }

        let distinct = distinct_labels(points);
        let distinct_count = distinct.iter().max().map_or(0, |m| m + 1);
        if distinct_count <= k {
            log::debug!("cluster: distinct n={n} k={k} distinct={distinct_count}");
            return Ok(distinct);
        }

        let labels = self.fit_predict(points, k)?;
        let labels = canonicalize(&labels);
        log::debug!(
            "cluster: kmeans n={n} k={k} clusters={}",
            labels.iter().max().map_or(0, |m| m + 1)
        );
        Ok(labels)
    }

    fn fit_predict(&self, points: &[Coordinate], k: usize) -> Result<Vec<usize>> {
        let flat: Vec<f64> = points.iter().flat_map(|p| p.as_row()).collect();
        let records = Array2::from_shape_vec((points.len(), 2), flat)
            .map_err(|e| Error::clustering(format!("feature shape: {e}")))?;

        let fitted = catch_unwind(AssertUnwindSafe(|| {
            let rng = Xoshiro256Plus::seed_from_u64(self.seed);
            let dataset = DatasetBase::from(records.clone());
            KMeans::params_with_rng(k, rng)
                .n_runs(self.restarts.max(1))
                .max_n_iterations(self.max_iterations)
                .tolerance(self.tolerance)
                .fit(&dataset)
                .map(|model| model.predict(&records).to_vec())
        }))
        .map_err(|_| Error::clustering("k-means panicked"))?;

        let labels = fitted.map_err(|e| Error::clustering(e.to_string()))?;
        if labels.len() != points.len() {
            return Err(Error::clustering(format!(
                "expected {} labels, got {}",
                points.len(),
                labels.len()
            )));
        }
        Ok(labels)
    }
}

/// `max(1, round(n / 8))`, rounding halves to even.
pub fn auto_cluster_count(n: usize) -> usize {
    ((n as f64 / STOPS_PER_CLUSTER).round_ties_even() as usize).max(1)
}

/// Labels each point by the index of its coordinate among distinct
/// coordinates, in first-appearance order.
fn distinct_labels(points: &[Coordinate]) -> Vec<usize> {
    let mut seen: Vec<(u64, u64)> = Vec::new();
    points
        .iter()
        .map(|p| {
            let key = (p.lat.to_bits(), p.lng.to_bits());
            seen.iter().position(|s| *s == key).unwrap_or_else(|| {
                seen.push(key);
                seen.len() - 1
            })
        })
        .collect()
}

fn canonicalize(labels: &[usize]) -> Vec<usize> {
    let mut order: Vec<usize> = Vec::new();
    labels
        .iter()
        .map(|label| {
            order.iter().position(|l| l == label).unwrap_or_else(|| {
                order.push(*label);
                order.len() - 1
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{ClusterAssigner, auto_cluster_count, canonicalize};
    use crate::Coordinate;

    fn grid(groups: &[(f64, f64)], per_group: usize) -> Vec<Coordinate> {
        groups
            .iter()
            .flat_map(|&(lat, lng)| {
                (0..per_group)
                    .map(move |i| Coordinate::new(lat + i as f64 * 1e-4, lng - i as f64 * 1e-4))
            })
            .collect()
    }

    #[test]
    fn empty_input_gives_empty_labels() {
        let labels = ClusterAssigner::default().assign(&[], Some(3)).expect("labels");
        assert!(labels.is_empty());
    }

    #[test]
    fn k_at_or_above_n_is_identity() {
        let points = grid(&[(-0.18, -78.48)], 4);
        for k in [4, 5, 40] {
            let labels = ClusterAssigner::default()
                .assign(&points, Some(k))
                .expect("labels");
            assert_eq!(labels, vec![0, 1, 2, 3]);
        }
    }

    #[test]
    fn auto_count_targets_eight_stops_per_cluster() {
        assert_eq!(auto_cluster_count(1), 1);
        assert_eq!(auto_cluster_count(4), 1);
        assert_eq!(auto_cluster_count(12), 2);
        assert_eq!(auto_cluster_count(20), 2);
        assert_eq!(auto_cluster_count(28), 4);
        assert_eq!(auto_cluster_count(40), 5);
    }

    #[test]
    fn zero_k_is_treated_as_auto() {
        let points = grid(&[(-0.18, -78.48)], 3);
        let labels = ClusterAssigner::default().assign(&points, Some(0)).expect("labels");
        assert_eq!(labels, vec![0, 0, 0]);
    }

    #[test]
    fn separates_distant_groups() {
        let points = grid(&[(-0.18, -78.48), (-2.19, -79.88), (-2.90, -79.00)], 6);
        let labels = ClusterAssigner::default()
            .assign(&points, Some(3))
            .expect("labels");

        assert_eq!(labels.len(), 18);
        for group in labels.chunks(6) {
            assert!(group.iter().all(|l| *l == group[0]));
        }
        assert_eq!(labels[0], 0);
        assert_eq!(labels[6], 1);
        assert_eq!(labels[12], 2);
    }

    #[test]
    fn same_seed_gives_same_labels() {
        let points = grid(&[(-0.18, -78.48), (-0.20, -78.50), (-0.25, -78.45)], 5);
        let assigner = ClusterAssigner::default().with_seed(7);

        let first = assigner.assign(&points, Some(4)).expect("labels");
        let second = assigner.assign(&points, Some(4)).expect("labels");

        assert_eq!(first, second);
        assert!(first.iter().all(|l| *l < 4));
    }

    #[test]
    fn duplicate_points_fall_back_to_distinct_labels() {
        let points = vec![
            Coordinate::new(1.0, 1.0),
            Coordinate::new(2.0, 2.0),
            Coordinate::new(1.0, 1.0),
            Coordinate::new(2.0, 2.0),
        ];
        let labels = ClusterAssigner::default()
            .assign(&points, Some(3))
            .expect("labels");
        assert_eq!(labels, vec![0, 1, 0, 1]);
    }

    #[test]
    fn canonical_labels_follow_first_appearance() {
        assert_eq!(canonicalize(&[2, 2, 0, 1, 0]), vec![0, 0, 1, 2, 1]);
    }
}
