use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use courier_route_derive::{CliOptions, CliValue, KvDisplay};
use log::LevelFilter;

use crate::{
    Coordinate, Error, Result,
    constants::{
        DEFAULT_CLUSTER_RESTARTS, DEFAULT_CLUSTER_SEED, DEFAULT_MATRIX_ENDPOINT, DEFAULT_MAX_SWEEPS,
        DEFAULT_REQUEST_TIMEOUT,
    },
};

/// Runtime options for the routing CLI.
#[derive(Clone, Debug, CliOptions, KvDisplay)]
pub struct RouteOptions {
    /// Request JSON path. Empty means stdin.
    #[cli(long = "input")]
    pub input: String,
    /// Report JSON path. Empty means stdout.
    #[cli(long = "output")]
    pub output: String,
    /// Overrides the origin of every request with the courier's current position.
    #[cli(long = "origin", parse_with = "Coordinate::parse")]
    #[kv(fmt = "opt")]
    pub origin: Option<Coordinate>,
    /// Credential for the travel-time service.
    #[cli(long = "api-key", env = "GOOGLE_MAPS_API_KEY")]
    #[kv(fmt = "secret")]
    pub api_key: String,
    /// Travel-time service endpoint.
    #[cli(long = "matrix-endpoint")]
    pub matrix_endpoint: String,
    #[cli(long = "travel-mode", parse_with = "TravelMode::parse")]
    pub travel_mode: TravelMode,
    /// Timeout (seconds) for the travel-time request.
    #[cli(long = "request-timeout")]
    pub request_timeout: u64,
    /// Serialized delay model. Empty means neutral priorities.
    #[cli(long = "model", env = "COURIER_ROUTE_MODEL")]
    pub model: String,
    /// Explicit cluster count applied to requests that do not carry one.
    #[cli(long = "cluster-count")]
    #[kv(fmt = "opt")]
    pub cluster_count: Option<usize>,
    #[cli(long = "cluster-seed")]
    pub cluster_seed: u64,
    #[cli(long = "cluster-restarts")]
    pub cluster_restarts: usize,
    /// Upper bound on full 2-opt sweeps.
    #[cli(long = "max-sweeps")]
    pub max_sweeps: usize,
    /// Worker threads for batch input. 0 uses the rayon default.
    #[cli(long = "threads")]
    pub threads: usize,
    #[cli(long = "log-level", parse_with = "LogLevel::parse")]
    pub log_level: LogLevel,
    #[cli(long = "log-format", parse_with = "LogFormat::parse")]
    pub log_format: LogFormat,
    pub log_timestamp: bool,
    /// Log file path. Empty means stderr.
    #[cli(long = "log-output")]
    pub log_output: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, CliValue)]
#[cli_value(option = "log-level")]
pub enum LogLevel {
    Error,
    #[cli(alias = "warning")]
    Warn,
    Info,
    Debug,
    Trace,
    Off,
}

impl LogLevel {
    pub fn to_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
            Self::Off => LevelFilter::Off,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, CliValue)]
#[cli_value(option = "log-format")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, CliValue)]
#[cli_value(option = "travel-mode")]
pub enum TravelMode {
    Driving,
    Walking,
    Bicycling,
    Transit,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            input: String::new(),
            output: String::new(),
            origin: None,
            api_key: String::new(),
            matrix_endpoint: DEFAULT_MATRIX_ENDPOINT.to_string(),
            travel_mode: TravelMode::Driving,
            request_timeout: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            model: String::new(),
            cluster_count: None,
            cluster_seed: DEFAULT_CLUSTER_SEED,
            cluster_restarts: DEFAULT_CLUSTER_RESTARTS,
            max_sweeps: DEFAULT_MAX_SWEEPS,
            threads: 0,
            log_level: LogLevel::Warn,
            log_format: LogFormat::Compact,
            log_timestamp: true,
            log_output: String::new(),
        }
    }
}

impl RouteOptions {
    pub fn from_args() -> Result<Self> {
        let mut options = Self::default();
        options.apply_env_with(|key| env::var(key).ok())?;
        options.apply_args(env::args().skip(1))?;
        Ok(options)
    }

    fn apply_args<I, S>(&mut self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut args = args
            .into_iter()
            .map(|arg| arg.as_ref().to_owned())
            .peekable();

        while let Some(arg) = args.next() {
            if arg == "--help" || arg == "-h" {
                return Err(Error::invalid_input(Self::usage()));
            }

            let Some(raw_name) = arg.strip_prefix("--") else {
                return Err(Error::invalid_input(format!(
                    "Unexpected argument: {arg}\n\n{}",
                    Self::usage()
                )));
            };

            if raw_name.is_empty() {
                return Err(Error::invalid_input(format!(
                    "Invalid option name: {arg}\n\n{}",
                    Self::usage()
                )));
            }

            let (name, value) = Self::split_arg(raw_name, &mut args);

            if self.apply_cli_option(&name, value.clone())? {
                continue;
            }

            match name.as_str() {
                "log-timestamp" => {
                    self.log_timestamp = match value {
                        Some(v) => parse_bool(&name, &v)?,
                        None => true,
                    };
                }
                "no-log-timestamp" => {
                    if value.is_some() {
                        return Err(Error::invalid_input(format!(
                            "Flag --{name} does not take a value"
                        )));
                    }
                    self.log_timestamp = false;
                }
                _ => {
                    return Err(Error::invalid_input(format!(
                        "Unknown option: --{name}\n\n{}",
                        Self::usage()
                    )));
                }
            }
        }

        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if self.request_timeout == 0 {
            return Err(Error::invalid_input("request_timeout must be > 0"));
        }
        if self.cluster_restarts == 0 {
            return Err(Error::invalid_input("cluster_restarts must be > 0"));
        }
        if let Some(origin) = self.origin
            && !origin.is_valid()
        {
            return Err(Error::invalid_input(format!(
                "origin out of range: {origin}"
            )));
        }
        Ok(())
    }

    pub fn usage() -> &'static str {
        concat!(
            "Usage:\n",
            "  courier-route [options] [--input requests.json]\n",
            "  courier-route [options] < requests.json\n\n",
            "Options:\n",
            "  --input <path>\n",
            "  --output <path>\n",
            "  --origin <lat,lng>\n",
            "  --api-key <key>              (env GOOGLE_MAPS_API_KEY)\n",
            "  --matrix-endpoint <url>\n",
            "  --travel-mode <driving|walking|bicycling|transit>\n",
            "  --request-timeout <secs>\n",
            "  --model <path>               (env COURIER_ROUTE_MODEL)\n",
            "  --cluster-count <usize>\n",
            "  --cluster-seed <u64>\n",
            "  --cluster-restarts <usize>\n",
            "  --max-sweeps <usize>\n",
            "  --threads <usize>\n",
            "  --log-level <error|warn|info|debug|trace|off>\n",
            "  --log-format <compact|pretty|json>\n",
            "  --log-timestamp[=<bool>]\n",
            "  --no-log-timestamp\n",
            "  --log-output <path>\n",
            "  --help\n",
            "\n",
            "Examples:\n",
            "  courier-route --input requests.json --output routes.json\n",
            "  courier-route --api-key=$KEY --log-level=info < requests.json\n",
            "  courier-route --model delay_model.json --max-sweeps=50 < requests.json\n",
        )
    }

    pub fn input_path(&self) -> Option<&Path> {
        non_stdio_path(&self.input)
    }

    pub fn output_path(&self) -> Option<&Path> {
        non_stdio_path(&self.output)
    }

    pub fn log_output_path(&self) -> Option<&Path> {
        non_stdio_path(&self.log_output)
    }

    pub fn model_path(&self) -> Option<PathBuf> {
        non_stdio_path(&self.model).map(Path::to_path_buf)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

fn non_stdio_path(raw: &str) -> Option<&Path> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "-" {
        None
    } else {
        Some(Path::new(raw))
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::invalid_input(format!(
            "Invalid boolean for --{name}: {value} (expected true/false)"
        ))),
    }
}
