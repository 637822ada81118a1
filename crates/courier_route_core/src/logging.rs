use std::{fs::File, io::Write};

use env_logger::{Builder, Target, fmt::Formatter};
use log::{Level, Record};

use crate::{Error, LogFormat, Result, RouteOptions};

/// Installs the global logger. Fails if a logger is already set.
pub fn init_logger(options: &RouteOptions) -> Result<()> {
    let log_format = options.log_format;
    let log_timestamp = options.log_timestamp;

    let mut builder = Builder::new();
    builder
        .filter_level(options.log_level.to_filter())
        .write_style(env_logger::WriteStyle::Never)
        .format(move |buf: &mut Formatter, record| match log_format {
            LogFormat::Json => {
                let timestamp = log_timestamp.then(|| buf.timestamp_millis().to_string());
                writeln!(buf, "{}", json_line(record, timestamp))
            }
            LogFormat::Compact | LogFormat::Pretty => {
                if log_timestamp {
                    write!(buf, "{} ", buf.timestamp_millis())?;
                }
                if log_format == LogFormat::Pretty {
                    writeln!(
                        buf,
                        "{} [{}] {}",
                        level_tag(record.level()),
                        record.target(),
                        record.args()
                    )
                } else {
                    writeln!(buf, "{} {}", level_tag(record.level()), record.args())
                }
            }
        });

    if let Some(log_path) = options.log_output_path() {
        let log_file = File::create(log_path).map_err(|e| {
            Error::other(format!(
                "failed to create log output file {}: {e}",
                log_path.display()
            ))
        })?;
        builder.target(Target::Pipe(Box::new(log_file)));
    } else {
        builder.target(Target::Stderr);
    }

    builder
        .try_init()
        .map_err(|e| Error::other(format!("logger init failed: {e}")))
}

fn json_line(record: &Record<'_>, timestamp: Option<String>) -> serde_json::Value {
    let mut line = serde_json::json!({
        "level": level_tag(record.level()),
        "target": record.target(),
        "message": record.args().to_string(),
    });
    if let Some(ts) = timestamp {
        line["ts"] = serde_json::Value::String(ts);
    }
    line
}

fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}
