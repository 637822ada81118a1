use std::{
    fs::File,
    io::{self, BufWriter, Write},
};

use crate::{Error, Result, RouteOptions, orchestrator::RouteReport};

/// Writes the reports as a pretty JSON array to `--output` or stdout.
pub fn write_reports(options: &RouteOptions, reports: &[RouteReport]) -> Result<()> {
    match options.output_path() {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                Error::other(format!("failed to create output file {}: {e}", path.display()))
            })?;
            write_json(BufWriter::new(file), reports)
        }
        None => write_json(io::stdout().lock(), reports),
    }
}

fn write_json<W: Write>(mut out: W, reports: &[RouteReport]) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, reports)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::write_json;
    use crate::{
        ServiceType, Stop,
        orchestrator::{RouteReport, RouteResult},
    };

    #[test]
    fn reports_serialize_as_a_json_array() {
        let report = RouteReport {
            courier_id: Some("c-7".to_string()),
            result: RouteResult {
                order_indices: vec![0, 1],
                ordered_stops: vec![Stop::new("A", 1.0, 2.0, ServiceType::Express)],
                total_time_minutes: 4,
            },
            cluster_labels: vec![0],
            priorities: vec![0.5],
            ..RouteReport::default()
        };

        let mut buf = Vec::new();
        write_json(&mut buf, &[report]).expect("write");
        let parsed: Value = serde_json::from_slice(&buf).expect("json");

        assert_eq!(parsed[0]["courier_id"], "c-7");
        assert_eq!(parsed[0]["result"]["order_indices"], serde_json::json!([0, 1]));
        assert_eq!(parsed[0]["result"]["total_time_minutes"], 4);
        assert_eq!(parsed[0]["result"]["ordered_stops"][0]["service_type"], "express");
        assert_eq!(parsed[0]["metrics"]["legs"], 0);
    }

    #[test]
    fn empty_batch_is_an_empty_array() {
        let mut buf = Vec::new();
        write_json(&mut buf, &[]).expect("write");
        assert_eq!(String::from_utf8(buf).expect("utf8").trim(), "[]");
    }
}
