use std::sync::Arc;

use rayon::prelude::*;

use crate::{
    CancelToken, ClusterAssigner, CostMatrix, CostMatrixBuilder, Error, GoogleDistanceMatrix,
    Result, RouteOptions, RouteRequest, TravelTimeService,
    model::DelayModel,
    orchestrator::{RouteOrchestrator, RouteReport},
};

/// Routes every request, one courier per rayon task. Requests without a
/// precomputed matrix get one from the configured travel-time service.
/// Reports come back in request order.
#[courier_route_derive::timer("runner.batch")]
pub fn run_batch(
    requests: Vec<RouteRequest>,
    options: &RouteOptions,
    model: Option<Arc<dyn DelayModel>>,
    cancel: &CancelToken,
) -> Result<Vec<RouteReport>> {
    let builder = if requests.iter().any(|r| r.cost_matrix.is_none()) {
        matrix_builder(options)
    } else {
        None
    };
    run_batch_with(requests, options, model, cancel, builder.as_ref())
}

pub fn run_batch_with<S: TravelTimeService>(
    requests: Vec<RouteRequest>,
    options: &RouteOptions,
    model: Option<Arc<dyn DelayModel>>,
    cancel: &CancelToken,
    builder: Option<&CostMatrixBuilder<S>>,
) -> Result<Vec<RouteReport>> {
    let orchestrator = RouteOrchestrator::new()
        .with_model(model)
        .with_cancel_token(cancel.clone())
        .with_cluster_assigner(
            ClusterAssigner::default()
                .with_seed(options.cluster_seed)
                .with_restarts(options.cluster_restarts),
        )
        .with_max_sweeps(options.max_sweeps);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.threads)
        .build()
        .map_err(|e| Error::other(format!("rayon pool: {e}")))?;

    log::info!(
        "runner: start requests={} threads={}",
        requests.len(),
        pool.current_num_threads()
    );

    let reports: Vec<RouteReport> = pool.install(|| {
        requests
            .into_par_iter()
            .enumerate()
            .map(|(idx, request)| route_one(idx, request, &orchestrator, builder))
            .collect()
    });
    Ok(reports)
}

/// `None` when the HTTP client cannot be set up; those requests are then
/// routed over an all-sentinel matrix.
fn matrix_builder(options: &RouteOptions) -> Option<CostMatrixBuilder<GoogleDistanceMatrix>> {
    if !options.has_api_key() {
        log::warn!("runner: no api key set, travel-time requests will likely fail");
    }
    match GoogleDistanceMatrix::with_settings(
        options.api_key.clone(),
        options.matrix_endpoint.clone(),
        options.travel_mode,
        options.request_timeout(),
    ) {
        Ok(service) => Some(CostMatrixBuilder::new(service)),
        Err(err) => {
            log::warn!("runner: client setup failed err={err}, using sentinel matrices");
            None
        }
    }
}

fn route_one<S: TravelTimeService>(
    idx: usize,
    request: RouteRequest,
    orchestrator: &RouteOrchestrator,
    builder: Option<&CostMatrixBuilder<S>>,
) -> RouteReport {
    let rows = match (request.cost_matrix.as_ref(), builder) {
        (Some(rows), _) => rows.clone(),
        (None, Some(builder)) => builder.build(&request.coordinates()).rows(),
        (None, None) => CostMatrix::sentinel(request.stops.len() + 1).rows(),
    };

    let mut report = orchestrator.compute_report(
        request.origin,
        &request.stops,
        &rows,
        request.cluster_count,
    );

    log::info!(
        "runner: routed idx={idx} courier={} stops={} total_min={}",
        request.label(),
        request.stops.len(),
        report.result.total_time_minutes
    );

    report.courier_id = request.courier_id;
    report
}
