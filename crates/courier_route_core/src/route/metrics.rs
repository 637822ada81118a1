use serde::Serialize;

use crate::{CostMatrix, constants::SENTINEL_COST};

/// Leg statistics for an open tour, in the matrix's unit (minutes).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RouteMetrics {
    pub legs: usize,
    pub total: f64,
    pub longest: f64,
    pub average: f64,
    /// Legs priced at the sentinel cost, i.e. no usable travel time.
    pub unreachable_legs: usize,
}

impl RouteMetrics {
    pub fn from_tour(tour: &[usize], matrix: &CostMatrix) -> Self {
        let costs: Vec<f64> = tour
            .windows(2)
            .filter_map(|leg| matrix.cost(leg[0], leg[1]))
            .collect();

        if costs.is_empty() {
            log::info!("metrics: legs=0 so there's nothing to report");
            return Self::default();
        }

        let legs = costs.len();
        let total: f64 = costs.iter().sum();
        let average = total / legs as f64;
        let longest = costs.iter().copied().fold(0.0_f64, f64::max);
        let unreachable_legs = costs.iter().filter(|c| **c >= SENTINEL_COST).count();

        log::info!(
            "metrics: legs={legs} total_min={total:.1} longest_min={longest:.1} avg_min={average:.1} unreachable={unreachable_legs}",
        );

        Self {
            legs,
            total,
            longest,
            average,
            unreachable_legs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RouteMetrics;
    use crate::{CostMatrix, constants::SENTINEL_COST};

    #[test]
    fn summarizes_each_leg() {
        let matrix = CostMatrix::from_rows(&[
            vec![0.0, 2.0, 9.0, 6.0],
            vec![2.0, 0.0, 3.0, 7.0],
            vec![9.0, 3.0, 0.0, 1.0],
            vec![6.0, 7.0, 1.0, 0.0],
        ])
        .expect("matrix");

        let metrics = RouteMetrics::from_tour(&[0, 1, 2, 3], &matrix);

        assert_eq!(metrics.legs, 3);
        assert_eq!(metrics.total, 6.0);
        assert_eq!(metrics.longest, 3.0);
        assert_eq!(metrics.average, 2.0);
        assert_eq!(metrics.unreachable_legs, 0);
    }

    #[test]
    fn counts_sentinel_legs_as_unreachable() {
        let metrics = RouteMetrics::from_tour(&[0, 2, 1], &CostMatrix::sentinel(3));
        assert_eq!(metrics.legs, 2);
        assert_eq!(metrics.unreachable_legs, 2);
        assert_eq!(metrics.longest, SENTINEL_COST);
    }

    #[test]
    fn single_node_tour_reports_nothing() {
        assert_eq!(
            RouteMetrics::from_tour(&[0], &CostMatrix::zeros(1)),
            RouteMetrics::default()
        );
    }
}
