//! Single-courier tour construction and refinement over a cost matrix.
//! A tour is a sequence of matrix indices that always starts at the origin
//! (index 0) and is never closed back to it.

mod construct;
mod metrics;
mod refine;

pub use construct::nearest_neighbor;
pub use metrics::RouteMetrics;
pub use refine::two_opt;

use crate::CostMatrix;

pub type Tour = Vec<usize>;

/// Sum of consecutive leg costs. Legs whose endpoints fall outside the
/// matrix are skipped.
pub fn tour_cost(tour: &[usize], matrix: &CostMatrix) -> f64 {
    tour.windows(2)
        .filter_map(|leg| matrix.cost(leg[0], leg[1]))
        .sum()
}
