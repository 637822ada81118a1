//! Single-courier route optimization: geographic clustering, delay-risk
//! scoring, a fail-soft travel-time matrix and nearest-neighbor + 2-opt
//! sequencing, with a batch runner for several couriers at once.

mod cancel;
pub mod cluster;
pub mod constants;
mod error;
mod io;
pub mod logging;
mod matrix;
pub mod model;
mod node;
pub mod orchestrator;
pub mod priority;
pub mod route;
pub mod runner;

pub use cancel::CancelToken;
pub use cluster::ClusterAssigner;
pub use error::{Error, Result};
pub use io::input::{RouteRequest, ServiceType, Stop, load_requests};
pub use io::output::write_reports;
pub use io::options::{LogFormat, LogLevel, RouteOptions, TravelMode};
pub use matrix::{
    CostMatrix, CostMatrixBuilder, GoogleDistanceMatrix, TravelTimeService, build_time_matrix,
};
pub use model::{DelayModel, LogisticDelayModel, load_delay_model};
pub use node::Coordinate;
pub use orchestrator::{RouteOrchestrator, RouteReport, RouteResult};
pub use priority::{Feature, score_priority};
pub use route::{RouteMetrics, Tour, nearest_neighbor, two_opt};
pub use runner::run_batch;
