use std::time::Duration;

/// Travel cost (minutes) standing in for an unknown or unreachable edge.
pub const SENTINEL_COST: f64 = 1e6;

/// Target number of stops per geographic cluster when `k` is not given.
pub(crate) const STOPS_PER_CLUSTER: f64 = 8.0;
pub(crate) const DEFAULT_CLUSTER_SEED: u64 = 42;
pub(crate) const DEFAULT_CLUSTER_RESTARTS: usize = 10;
pub(crate) const DEFAULT_CLUSTER_MAX_ITERATIONS: u64 = 300;
pub(crate) const DEFAULT_CLUSTER_TOLERANCE: f64 = 1e-4;
/// Below this many stops every stop lands in cluster 0.
pub(crate) const MIN_STOPS_FOR_CLUSTERING: usize = 3;

pub(crate) const NEUTRAL_PRIORITY: f64 = 0.5;

pub(crate) const MIN_TOUR_SIZE_FOR_2OPT: usize = 4;
pub(crate) const TWO_OPT_IMPROVEMENT_EPSILON: f64 = 1e-6;
pub(crate) const DEFAULT_MAX_SWEEPS: usize = 200;

pub(crate) const SECONDS_PER_MINUTE: f64 = 60.0;
pub(crate) const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub(crate) const DEFAULT_MATRIX_ENDPOINT: &str =
    "https://maps.googleapis.com/maps/api/distancematrix/json";
