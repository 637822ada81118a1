use super::Tour;
use crate::CostMatrix;

/// Greedy tour from the origin: always extend to the cheapest unvisited
/// index, ties going to the smallest index.
#[courier_route_derive::timer("construct.nearest_neighbor")]
pub fn nearest_neighbor(matrix: &CostMatrix) -> Tour {
    let m = matrix.size();
    if m == 0 {
        return Vec::new();
    }

    let mut visited = vec![false; m];
    let mut tour = Vec::with_capacity(m);
    let mut current = 0usize;
    visited[current] = true;
    tour.push(current);

    while tour.len() < m {
        let mut best: Option<(usize, f64)> = None;
        for next in (0..m).filter(|&j| !visited[j]) {
            let cost = matrix[(current, next)];
            if best.is_none_or(|(_, best_cost)| cost < best_cost) {
                best = Some((next, cost));
            }
        }

        let Some((next, _)) = best else {
            break;
        };
        visited[next] = true;
        tour.push(next);
        current = next;
    }

    log::debug!("construct: n={m} tour_len={}", tour.len());
    tour
}
