use serde_json::Value;

use super::{CostMatrix, GoogleDistanceMatrix, TravelTimeService};
use crate::{
    Coordinate, Result,
    constants::{SECONDS_PER_MINUTE, SENTINEL_COST},
};

/// Turns coordinates into a sanitized travel-time matrix in minutes.
///
/// Service unavailability never surfaces as an error from [`build`]: a failed
/// request yields an all-sentinel matrix and a malformed cell yields a
/// sentinel cell.
///
/// [`build`]: CostMatrixBuilder::build
pub struct CostMatrixBuilder<S> {
    service: S,
}

impl<S: TravelTimeService> CostMatrixBuilder<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    #[courier_route_derive::timer("matrix.build")]
    pub fn build(&self, coords: &[Coordinate]) -> CostMatrix {
        match self.try_build(coords) {
            Ok(matrix) => matrix,
            Err(err) => {
                log::warn!(
                    "matrix: request failed n={} err={err}, using sentinel matrix",
                    coords.len()
                );
                CostMatrix::sentinel(coords.len())
            }
        }
    }

    pub fn try_build(&self, coords: &[Coordinate]) -> Result<CostMatrix> {
        if coords.len() < 2 {
            return Ok(CostMatrix::zeros(coords.len()));
        }
        let body = self.service.fetch(coords)?;
        Ok(parse_duration_matrix(&body, coords.len()))
    }
}

/// One-shot helper using the Google client with default settings.
pub fn build_time_matrix(coords: &[Coordinate], api_key: &str) -> CostMatrix {
    match GoogleDistanceMatrix::new(api_key) {
        Ok(service) => CostMatrixBuilder::new(service).build(coords),
        Err(err) => {
            log::warn!("matrix: client setup failed err={err}, using sentinel matrix");
            CostMatrix::sentinel(coords.len())
        }
    }
}

/// Reads `rows[i].elements[j].duration.value` (seconds) into minutes.
fn parse_duration_matrix(body: &Value, n: usize) -> CostMatrix {
    let mut matrix = CostMatrix::zeros(n);
    let mut missing = 0usize;

    for i in 0..n {
        for j in 0..n {
            let seconds = body
                .pointer(&format!("/rows/{i}/elements/{j}/duration/value"))
                .and_then(Value::as_f64)
                .filter(|v| v.is_finite() && *v >= 0.0);
            let minutes = match seconds {
                Some(seconds) => seconds / SECONDS_PER_MINUTE,
                None => {
                    missing += 1;
                    SENTINEL_COST
                }
            };
            matrix.set(i, j, minutes);
        }
    }

    if missing > 0 {
        log::warn!("matrix: missing cells={missing} of {} replaced by sentinel", n * n);
    } else {
        log::debug!("matrix: parsed n={n}");
    }
    matrix
}
