//! The per-courier routing pipeline: cluster, score, construct, refine.

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use serde::Serialize;

use crate::{
    CancelToken, ClusterAssigner, Coordinate, CostMatrix, Result, Stop,
    constants::{DEFAULT_MAX_SWEEPS, MIN_STOPS_FOR_CLUSTERING},
    model::DelayModel,
    priority::{Feature, score_priority},
    route::{RouteMetrics, Tour, nearest_neighbor, tour_cost, two_opt},
};

/// Visiting order for one courier. The empty value is the canonical
/// degraded answer.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RouteResult {
    pub order_indices: Tour,
    pub ordered_stops: Vec<Stop>,
    pub total_time_minutes: u64,
}

impl RouteResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.order_indices.is_empty()
    }
}

/// A [`RouteResult`] plus the intermediate values computed on the way.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RouteReport {
    pub courier_id: Option<String>,
    pub result: RouteResult,
    pub cluster_labels: Vec<usize>,
    /// Delay risk per stop. Reported only; ordering does not use it.
    pub priorities: Vec<f64>,
    pub metrics: RouteMetrics,
}

#[derive(Clone)]
pub struct RouteOrchestrator {
    model: Option<Arc<dyn DelayModel>>,
    cancel: CancelToken,
    clusters: ClusterAssigner,
    max_sweeps: usize,
}

impl Default for RouteOrchestrator {
    fn default() -> Self {
        Self {
            model: None,
            cancel: CancelToken::new(),
            clusters: ClusterAssigner::default(),
            max_sweeps: DEFAULT_MAX_SWEEPS,
        }
    }
}

impl RouteOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: Option<Arc<dyn DelayModel>>) -> Self {
        self.model = model;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_cluster_assigner(mut self, clusters: ClusterAssigner) -> Self {
        self.clusters = clusters;
        self
    }

    pub fn with_max_sweeps(mut self, max_sweeps: usize) -> Self {
        self.max_sweeps = max_sweeps;
        self
    }

    /// Never fails. Any error or panic below collapses into
    /// [`RouteResult::empty`].
    pub fn compute(
        &self,
        origin: Coordinate,
        stops: &[Stop],
        cost_rows: &[Vec<f64>],
        cluster_count: Option<usize>,
    ) -> RouteResult {
        self.compute_report(origin, stops, cost_rows, cluster_count)
            .result
    }

    pub fn compute_report(
        &self,
        origin: Coordinate,
        stops: &[Stop],
        cost_rows: &[Vec<f64>],
        cluster_count: Option<usize>,
    ) -> RouteReport {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.try_compute(origin, stops, cost_rows, cluster_count)
        }));

        match outcome {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                log::error!("router: empty result stops={} error={e}", stops.len());
                RouteReport::default()
            }
            Err(_) => {
                log::error!("router: empty result stops={} error=panicked", stops.len());
                RouteReport::default()
            }
        }
    }

    /// The fallible pipeline behind [`Self::compute_report`].
    pub fn try_compute(
        &self,
        origin: Coordinate,
        stops: &[Stop],
        cost_rows: &[Vec<f64>],
        cluster_count: Option<usize>,
    ) -> Result<RouteReport> {
        if stops.is_empty() {
            log::debug!("router: no stops origin={origin}");
            return Ok(RouteReport::default());
        }
        log::debug!(
            "router: start origin={origin} stops={} matrix_rows={}",
            stops.len(),
            cost_rows.len()
        );

        let cluster_labels = if stops.len() < MIN_STOPS_FOR_CLUSTERING {
            vec![0; stops.len()]
        } else {
            let points: Vec<Coordinate> = stops.iter().map(Stop::coordinate).collect();
            self.clusters.assign(&points, cluster_count)?
        };

        let features: Vec<Feature> = cluster_labels
            .iter()
            .zip(stops)
            .map(|(&cluster_id, stop)| Feature::new(cluster_id, stop.service_type))
            .collect();
        let priorities = score_priority(self.model.as_deref(), &features);

        let matrix = CostMatrix::from_rows(cost_rows)?;
        if matrix.is_empty() {
            log::warn!("router: empty cost matrix stops={}", stops.len());
            return Ok(RouteReport {
                cluster_labels,
                priorities,
                ..RouteReport::default()
            });
        }
        if matrix.size() != stops.len() + 1 {
            log::warn!(
                "router: matrix size mismatch size={} expected={}",
                matrix.size(),
                stops.len() + 1
            );
        }

        let tour = nearest_neighbor(&matrix);
        let tour = two_opt(tour, &matrix, self.max_sweeps, &self.cancel);

        let total_time_minutes = tour_cost(&tour, &matrix).trunc() as u64;
        let ordered_stops: Vec<Stop> = tour
            .iter()
            .skip(1)
            .filter(|&&idx| (1..=stops.len()).contains(&idx))
            .map(|&idx| stops[idx - 1].clone())
            .collect();
        let metrics = RouteMetrics::from_tour(&tour, &matrix);

        log::info!(
            "router: complete stops={} routed={} total_min={total_time_minutes}",
            stops.len(),
            ordered_stops.len()
        );

        Ok(RouteReport {
            courier_id: None,
            result: RouteResult {
                order_indices: tour,
                ordered_stops,
                total_time_minutes,
            },
            cluster_labels,
            priorities,
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{RouteOrchestrator, RouteResult};
    use crate::{
        Coordinate, CostMatrix, CostMatrixBuilder, Result, ServiceType, Stop,
        TravelTimeService,
        model::{DelayModel, LogisticDelayModel},
    };

    fn origin() -> Coordinate {
        Coordinate::new(-0.1807, -78.4678)
    }

    fn stops() -> Vec<Stop> {
        vec![
            Stop::new("A", -0.1800, -78.4700, ServiceType::Standard),
            Stop::new("B", -0.1900, -78.4800, ServiceType::Express),
            Stop::new("C", -0.1950, -78.4850, ServiceType::Standard),
        ]
    }

    fn scenario_rows() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 2.0, 9.0, 6.0],
            vec![2.0, 0.0, 3.0, 7.0],
            vec![9.0, 3.0, 0.0, 1.0],
            vec![6.0, 7.0, 1.0, 0.0],
        ]
    }

    #[test]
    fn routes_the_three_stop_scenario() {
        let stops = stops();
        let result = RouteOrchestrator::new().compute(origin(), &stops, &scenario_rows(), None);

        assert_eq!(result.order_indices, vec![0, 1, 2, 3]);
        assert_eq!(result.ordered_stops, stops);
        assert_eq!(result.total_time_minutes, 6);
    }

    #[test]
    fn zero_stops_give_the_empty_result() {
        let result = RouteOrchestrator::new().compute(origin(), &[], &scenario_rows(), None);
        assert_eq!(result, RouteResult::empty());
        assert!(result.is_empty());
    }

    #[test]
    fn empty_matrix_gives_the_empty_result() {
        let result = RouteOrchestrator::new().compute(origin(), &stops(), &[], None);
        assert_eq!(result, RouteResult::empty());
    }

    #[test]
    fn ragged_matrix_gives_the_empty_result() {
        let rows = vec![vec![0.0, 1.0], vec![1.0]];
        let result = RouteOrchestrator::new().compute(origin(), &stops(), &rows, None);
        assert_eq!(result, RouteResult::empty());
    }

    #[test]
    fn oversized_matrix_skips_unknown_stops() {
        let all = stops();
        let stops = &all[..2];
        let rows = vec![
            vec![0.0, 1.0, 2.0, 3.0],
            vec![1.0, 0.0, 1.0, 2.0],
            vec![2.0, 1.0, 0.0, 1.0],
            vec![3.0, 2.0, 1.0, 0.0],
        ];

        let result = RouteOrchestrator::new().compute(origin(), stops, &rows, None);

        assert_eq!(result.order_indices, vec![0, 1, 2, 3]);
        assert_eq!(result.ordered_stops, stops.to_vec());
        assert_eq!(result.total_time_minutes, 3);
    }

    #[test]
    fn undersized_matrix_routes_what_it_covers() {
        let rows = vec![vec![0.0, 4.5], vec![4.5, 0.0]];
        let result = RouteOrchestrator::new().compute(origin(), &stops(), &rows, None);

        assert_eq!(result.order_indices, vec![0, 1]);
        assert_eq!(result.ordered_stops.len(), 1);
        assert_eq!(result.total_time_minutes, 4);
    }

    #[test]
    fn caller_matrix_is_left_untouched() {
        let rows = vec![
            vec![0.0, f64::NAN, 9.0, 6.0],
            vec![2.0, 0.0, 3.0, 7.0],
            vec![9.0, 3.0, 0.0, 1.0],
            vec![6.0, 7.0, 1.0, 0.0],
        ];
        let before = format!("{rows:?}");

        let result = RouteOrchestrator::new().compute(origin(), &stops(), &rows, None);

        assert_eq!(format!("{rows:?}"), before);
        assert_eq!(result.order_indices[0], 0);
        assert_eq!(result.order_indices.len(), 4);
    }

    #[test]
    fn few_stops_share_cluster_zero() {
        let rows = vec![
            vec![0.0, 2.0, 9.0],
            vec![2.0, 0.0, 3.0],
            vec![9.0, 3.0, 0.0],
        ];
        let report = RouteOrchestrator::new().compute_report(origin(), &stops()[..2], &rows, None);

        assert_eq!(report.cluster_labels, vec![0, 0]);
        assert_eq!(report.priorities, vec![0.5, 0.5]);
        assert_eq!(report.result.total_time_minutes, 5);
    }

    #[test]
    fn report_carries_priorities_from_the_model() {
        let model: Arc<dyn DelayModel> = Arc::new(LogisticDelayModel::new(0.0, 0.0, 0.0));
        let report = RouteOrchestrator::new()
            .with_model(Some(model))
            .compute_report(origin(), &stops(), &scenario_rows(), Some(1));

        assert_eq!(report.cluster_labels, vec![0, 0, 0]);
        assert_eq!(report.priorities, vec![0.5, 0.5, 0.5]);
        assert_eq!(report.metrics.total, 6.0);
        assert_eq!(report.result.total_time_minutes, 6);
    }

    #[test]
    fn sentinel_matrix_still_yields_a_permutation() {
        struct Broken;

        impl TravelTimeService for Broken {
            fn fetch(&self, _coords: &[Coordinate]) -> Result<serde_json::Value> {
                Ok(serde_json::json!({"status": "OK", "rows": "nonsense"}))
            }
        }

        let stops = stops();
        let coords: Vec<Coordinate> = std::iter::once(origin())
            .chain(stops.iter().map(Stop::coordinate))
            .collect();
        let matrix = CostMatrixBuilder::new(Broken).build(&coords);
        assert_eq!(matrix, CostMatrix::sentinel(4));

        let result = RouteOrchestrator::new().compute(origin(), &stops, &matrix.rows(), None);

        let mut sorted = result.order_indices.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2, 3]);
        assert_eq!(result.order_indices[0], 0);
        assert_eq!(result.ordered_stops.len(), 3);
    }
}
