use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;

use crate::{
    Coordinate, Error, Result, TravelMode,
    constants::{DEFAULT_MATRIX_ENDPOINT, DEFAULT_REQUEST_TIMEOUT},
};

/// External service answering one batched all-pairs travel-time query.
///
/// The response body is returned as raw JSON; interpreting it is the
/// builder's job so malformed cells can degrade individually.
pub trait TravelTimeService: Send + Sync {
    fn fetch(&self, coords: &[Coordinate]) -> Result<Value>;
}

/// Google Distance Matrix client. Every coordinate is sent as both an
/// origin and a destination.
#[derive(Clone, Debug)]
pub struct GoogleDistanceMatrix {
    client: Client,
    endpoint: String,
    api_key: String,
    mode: TravelMode,
}

impl GoogleDistanceMatrix {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_settings(
            api_key,
            DEFAULT_MATRIX_ENDPOINT,
            TravelMode::Driving,
            DEFAULT_REQUEST_TIMEOUT,
        )
    }

    pub fn with_settings(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        mode: TravelMode,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            mode,
        })
    }

    fn query_params(&self, coords: &[Coordinate]) -> [(&'static str, String); 4] {
        let joined = coords
            .iter()
            .map(Coordinate::to_string)
            .collect::<Vec<_>>()
            .join("|");
        [
            ("origins", joined.clone()),
            ("destinations", joined),
            ("key", self.api_key.clone()),
            ("mode", self.mode.to_string()),
        ]
    }
}

impl TravelTimeService for GoogleDistanceMatrix {
    fn fetch(&self, coords: &[Coordinate]) -> Result<Value> {
        log::debug!(
            "matrix: request endpoint={} n={} mode={}",
            self.endpoint,
            coords.len(),
            self.mode
        );

        let body: Value = self
            .client
            .get(&self.endpoint)
            .query(&self.query_params(coords))
            .send()?
            .error_for_status()?
            .json()?;

        check_status(&body)?;
        Ok(body)
    }
}

/// Rejects bodies whose top-level `status` reports a failed request.
fn check_status(body: &Value) -> Result<()> {
    match body.get("status").and_then(Value::as_str) {
        None | Some("OK") => Ok(()),
        Some(status) => {
            let message = body
                .get("error_message")
                .and_then(Value::as_str)
                .unwrap_or("no error message");
            Err(Error::service(format!("status={status} message={message}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::{GoogleDistanceMatrix, check_status};
    use crate::{Coordinate, TravelMode};

    #[test]
    fn query_params_repeat_coordinates_as_origins_and_destinations() {
        let service = GoogleDistanceMatrix::with_settings(
            "k3y",
            "http://localhost/matrix",
            TravelMode::Bicycling,
            Duration::from_secs(1),
        )
        .expect("build client");
        let params = service.query_params(&[Coordinate::new(4.6, -74.08), Coordinate::new(4.7, -74.1)]);

        assert_eq!(params[0], ("origins", "4.6,-74.08|4.7,-74.1".to_string()));
        assert_eq!(params[1].1, params[0].1);
        assert_eq!(params[2], ("key", "k3y".to_string()));
        assert_eq!(params[3], ("mode", "bicycling".to_string()));
    }

    #[test]
    fn check_status_accepts_ok_and_missing_status() {
        assert!(check_status(&json!({"status": "OK", "rows": []})).is_ok());
        assert!(check_status(&json!({"rows": []})).is_ok());
    }

    #[test]
    fn check_status_rejects_denied_requests() {
        let err = check_status(&json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid."
        }))
        .expect_err("denied request should fail");
        assert!(err.to_string().contains("status=REQUEST_DENIED"));
        assert!(err.to_string().contains("API key is invalid"));
    }
}
