use std::time::Instant;

use log::info;

use courier_route_core::{
    CancelToken, Result, RouteOptions, load_delay_model, load_requests, logging, run_batch,
    write_reports,
};

fn main() -> Result<()> {
    let now = Instant::now();
    let options = RouteOptions::from_args()?;
    logging::init_logger(&options)?;
    let requests = load_requests(&options)?;

    info!("input: requests={}", requests.len());
    info!("options: {options}");

    let cancel = CancelToken::interrupt();
    let model = options
        .model_path()
        .and_then(|path| load_delay_model(&path));

    let reports = run_batch(requests, &options, model, &cancel)?;
    write_reports(&options, &reports)?;

    let routed: usize = reports.iter().map(|r| r.result.ordered_stops.len()).sum();
    info!(
        "output: routes={} stops={routed} cancelled={} time={:.2}s",
        reports.len(),
        cancel.is_cancelled(),
        now.elapsed().as_secs_f32()
    );

    Ok(())
}
