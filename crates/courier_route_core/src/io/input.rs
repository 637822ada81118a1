use std::{fs, io::Read};

use courier_route_derive::CliValue;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{Coordinate, Error, Result, RouteOptions};

/// Delivery service level of a stop.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, CliValue, Serialize, Deserialize)]
#[cli_value(option = "service-type")]
#[serde(try_from = "String", into = "String")]
pub enum ServiceType {
    #[default]
    #[cli(alias = "estandar")]
    Standard,
    Express,
}

impl ServiceType {
    /// Numeric encoding fed to the delay model.
    pub fn code(self) -> u8 {
        match self {
            Self::Standard => 0,
            Self::Express => 1,
        }
    }
}

impl TryFrom<String> for ServiceType {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self> {
        Self::parse(&raw)
    }
}

impl From<ServiceType> for String {
    fn from(value: ServiceType) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub service_type: ServiceType,
}

impl Stop {
    pub fn new(id: impl Into<String>, lat: f64, lng: f64, service_type: ServiceType) -> Self {
        Self {
            id: id.into(),
            lat,
            lng,
            service_type,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// One courier's routing request.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RouteRequest {
    #[serde(default)]
    pub courier_id: Option<String>,
    pub origin: Coordinate,
    #[serde(default)]
    pub stops: Vec<Stop>,
    /// Precomputed travel times in minutes, origin first. Built from the
    /// travel-time service when absent.
    #[serde(default)]
    pub cost_matrix: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    pub cluster_count: Option<usize>,
}

impl RouteRequest {
    pub fn new(origin: Coordinate, stops: Vec<Stop>) -> Self {
        Self {
            courier_id: None,
            origin,
            stops,
            cost_matrix: None,
            cluster_count: None,
        }
    }

    /// Origin first, then every stop in input order.
    pub fn coordinates(&self) -> Vec<Coordinate> {
        std::iter::once(self.origin)
            .chain(self.stops.iter().map(Stop::coordinate))
            .collect()
    }

    pub fn label(&self) -> &str {
        self.courier_id.as_deref().unwrap_or("-")
    }

    fn validate(&self, idx: usize) -> Result<()> {
        if !self.origin.is_valid() {
            return Err(Error::invalid_input(format!(
                "request {idx}: origin out of range: {}",
                self.origin
            )));
        }
        if let Some(stop) = self.stops.iter().find(|s| !s.coordinate().is_valid()) {
            return Err(Error::invalid_input(format!(
                "request {idx}: stop '{}' out of range: {}",
                stop.id,
                stop.coordinate()
            )));
        }
        Ok(())
    }
}

/// Reads requests from `--input` or stdin and applies CLI overrides.
pub fn load_requests(options: &RouteOptions) -> Result<Vec<RouteRequest>> {
    let raw = match options.input_path() {
        Some(path) => fs::read_to_string(path).map_err(|e| {
            Error::invalid_input(format!("failed to read {}: {e}", path.display()))
        })?,
        None => {
            let mut raw = String::new();
            std::io::stdin().read_to_string(&mut raw)?;
            raw
        }
    };

    let mut requests = parse_requests(&raw)?;
    for request in &mut requests {
        if let Some(origin) = options.origin {
            request.origin = origin;
        }
        if request.cluster_count.is_none() {
            request.cluster_count = options.cluster_count;
        }
    }
    Ok(requests)
}

pub(crate) fn parse_requests(raw: &str) -> Result<Vec<RouteRequest>> {
    if raw.trim().is_empty() {
        return Err(Error::invalid_input("No route requests provided."));
    }

    let requests: Vec<RouteRequest> = if raw.trim_start().starts_with('[') {
        serde_json::from_str(raw)?
    } else {
        vec![serde_json::from_str(raw)?]
    };

    for (idx, request) in requests.iter().enumerate() {
        request.validate(idx)?;
    }
    Ok(requests)
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
        Id::Float(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{ServiceType, Stop, parse_requests};
    use crate::Coordinate;

    const SINGLE: &str = r#"{
        "courier_id": "m-7",
        "origin": {"lat": 4.60, "lng": -74.08},
        "stops": [
            {"id": "a", "lat": 4.61, "lng": -74.07, "service_type": "Express"},
            {"id": 42, "lat": 4.62, "lng": -74.06}
        ],
        "cluster_count": 2
    }"#;

    #[test]
    fn parse_requests_reads_single_object() {
        let requests = parse_requests(SINGLE).expect("parse request");
        assert_eq!(requests.len(), 1);

        let request = &requests[0];
        assert_eq!(request.label(), "m-7");
        assert_eq!(request.origin, Coordinate::new(4.60, -74.08));
        assert_eq!(request.cluster_count, Some(2));
        assert!(request.cost_matrix.is_none());
        assert_eq!(request.stops[0].service_type, ServiceType::Express);
        assert_eq!(request.stops[1].id, "42");
        assert_eq!(request.stops[1].service_type, ServiceType::Standard);
    }

    #[test]
    fn parse_requests_reads_batches_with_matrices() {
        let raw = r#"[
            {"origin": {"lat": 0, "lng": 0}, "stops": [], "cost_matrix": [[0]]},
            {"origin": {"lat": 1, "lng": 1},
             "stops": [{"id": "x", "lat": 1.1, "lng": 1.1, "service_type": "estandar"}],
             "cost_matrix": [[0, 3], [3, 0]]}
        ]"#;
        let requests = parse_requests(raw).expect("parse batch");
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].label(), "-");
        assert_eq!(
            requests[1].cost_matrix.as_deref(),
            Some(&[vec![0.0, 3.0], vec![3.0, 0.0]][..])
        );
        assert_eq!(requests[1].stops[0].service_type, ServiceType::Standard);
    }

    #[test]
    fn parse_requests_rejects_unknown_service_types() {
        let raw = r#"{"origin": {"lat": 0, "lng": 0},
            "stops": [{"id": "a", "lat": 0, "lng": 0, "service_type": "overnight"}]}"#;
        let err = parse_requests(raw).expect_err("unknown service type should fail");
        assert!(err.to_string().contains("expected standard|express"));
    }

    #[test]
    fn parse_requests_rejects_out_of_range_stops() {
        let raw = r#"{"origin": {"lat": 0, "lng": 0},
            "stops": [{"id": "bad", "lat": 123, "lng": 0}]}"#;
        let err = parse_requests(raw).expect_err("invalid stop should fail");
        assert!(err.to_string().contains("stop 'bad' out of range"));
    }

    #[test]
    fn parse_requests_rejects_empty_input() {
        let err = parse_requests(" \n ").expect_err("empty input should fail");
        assert!(err.to_string().contains("No route requests provided."));
    }

    #[test]
    fn coordinates_put_origin_first() {
        let requests = parse_requests(SINGLE).expect("parse request");
        let coords = requests[0].coordinates();
        assert_eq!(coords.len(), 3);
        assert_eq!(coords[0], Coordinate::new(4.60, -74.08));
        assert_eq!(coords[2], Coordinate::new(4.62, -74.06));
    }

    #[test]
    fn service_type_codes_and_serialization() {
        assert_eq!(ServiceType::Standard.code(), 0);
        assert_eq!(ServiceType::Express.code(), 1);

        let stop = Stop::new("s1", 1.0, 2.0, ServiceType::Express);
        let json = serde_json::to_string(&stop).expect("serialize stop");
        assert_eq!(
            json,
            r#"{"id":"s1","lat":1.0,"lng":2.0,"service_type":"express"}"#
        );
    }
}
