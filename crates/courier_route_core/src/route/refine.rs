use super::Tour;
use crate::{
    CancelToken, CostMatrix,
    constants::{MIN_TOUR_SIZE_FOR_2OPT, TWO_OPT_IMPROVEMENT_EPSILON},
};

/// First-improvement 2-opt over an open, origin-anchored tour.
///
/// Each sweep tries every edge pair `(a-1, a)` / `(b, b+1)` with
/// `1 <= a < b <= len - 2` and reverses `tour[a..=b]` as soon as the swap
/// lowers the tour cost by more than the improvement epsilon, then keeps
/// scanning. Sweeps repeat until one finds nothing or `max_sweeps` is hit.
/// Tours shorter than four nodes come back untouched.
///
/// The token is polled before every outer step; once cancelled the best
/// tour found so far is returned.
#[courier_route_derive::timer("refine.2opt")]
pub fn two_opt(mut tour: Tour, matrix: &CostMatrix, max_sweeps: usize, cancel: &CancelToken) -> Tour {
    let n = tour.len();
    if n < MIN_TOUR_SIZE_FOR_2OPT {
        log::debug!("refine: skip n={n} reason=insufficient_size");
        return tour;
    }

    let mut drift = (!matrix.is_symmetric()).then(|| ReversalDrift::new(&tour, matrix));
    let mut sweeps = 0usize;
    let mut total_swaps = 0usize;
    let mut cancelled = false;

    'sweeps: while sweeps < max_sweeps {
        sweeps += 1;
        let mut sweep_swaps = 0usize;

        for a in 1..(n - 2) {
            if cancel.is_cancelled() {
                cancelled = true;
                break 'sweeps;
            }
            for b in (a + 1)..(n - 1) {
                if !improves(&tour, matrix, drift.as_ref(), a, b) {
                    continue;
                }
                tour[a..=b].reverse();
                if let Some(drift) = drift.as_mut() {
                    drift.rebuild(&tour, matrix);
                }
                sweep_swaps += 1;
            }
        }

        total_swaps += sweep_swaps;
        log::trace!("refine: sweep={sweeps} swaps={sweep_swaps}");
        if sweep_swaps == 0 {
            break;
        }
    }

    if cancelled {
        log::warn!("refine: cancelled n={n} sweeps={sweeps} swaps={total_swaps}");
    } else {
        log::debug!("refine: complete n={n} sweeps={sweeps} swaps={total_swaps}");
    }
    tour
}

/// Whether reconnecting `(i,j)+(k,l)` as `(i,k)+(j,l)` pays off. Pairs
/// touching indices outside the matrix never do.
fn improves(
    tour: &[usize],
    matrix: &CostMatrix,
    drift: Option<&ReversalDrift>,
    a: usize,
    b: usize,
) -> bool {
    let (i, j, k, l) = (tour[a - 1], tour[a], tour[b], tour[b + 1]);
    let (Some(ij), Some(kl), Some(ik), Some(jl)) = (
        matrix.cost(i, j),
        matrix.cost(k, l),
        matrix.cost(i, k),
        matrix.cost(j, l),
    ) else {
        return false;
    };

    let old = ij + kl;
    let new = ik + jl + drift.map_or(0.0, |d| d.shift(a, b));
    new + TWO_OPT_IMPROVEMENT_EPSILON < old
}

/// Prefix sums of leg costs walked forwards and backwards. On directed
/// matrices a reversed segment changes its own internal cost too.
struct ReversalDrift {
    forward: Vec<f64>,
    backward: Vec<f64>,
}

impl ReversalDrift {
    fn new(tour: &[usize], matrix: &CostMatrix) -> Self {
        let mut drift = Self {
            forward: vec![0.0; tour.len()],
            backward: vec![0.0; tour.len()],
        };
        drift.rebuild(tour, matrix);
        drift
    }

    fn rebuild(&mut self, tour: &[usize], matrix: &CostMatrix) {
        for p in 1..tour.len() {
            let (u, v) = (tour[p - 1], tour[p]);
            self.forward[p] = self.forward[p - 1] + matrix.cost(u, v).unwrap_or(0.0);
            self.backward[p] = self.backward[p - 1] + matrix.cost(v, u).unwrap_or(0.0);
        }
    }

    /// Extra cost of traversing `tour[a..=b]` in reverse.
    fn shift(&self, a: usize, b: usize) -> f64 {
        (self.backward[b] - self.backward[a]) - (self.forward[b] - self.forward[a])
    }
}
