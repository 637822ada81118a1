//! Delay-risk models consumed by the priority scorer.

mod logistic;

use std::{fs::File, io::BufReader, path::Path, sync::Arc};

use ndarray::{Array1, ArrayD, ArrayView2};

pub use logistic::LogisticDelayModel;

use crate::Result;

/// A fitted classifier over `[cluster_id, service_type_code]` rows.
///
/// `predict_proba` returns either a `[rows, 2]` class-probability matrix,
/// whose second column is the delay class, or a plain vector of length
/// `rows`. Implementations must be free of side effects; one instance is
/// shared read-only across concurrent route computations.
pub trait DelayModel: Send + Sync {
    fn predict_proba(&self, features: ArrayView2<'_, f64>) -> Result<ArrayD<f64>>;

    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Array1<f64>>;
}

/// Loads the serialized model at `path`. Any failure is logged and yields
/// `None`, which the scorer treats as "no model".
pub fn load_delay_model(path: &Path) -> Option<Arc<dyn DelayModel>> {
    match read_model(path) {
        Ok(model) => {
            log::info!("model: loaded path={}", path.display());
            Some(Arc::new(model))
        }
        Err(e) => {
            log::warn!("model: unavailable path={} error={e}", path.display());
            None
        }
    }
}

fn read_model(path: &Path) -> Result<LogisticDelayModel> {
    let file = File::open(path)?;
    let model: LogisticDelayModel = serde_json::from_reader(BufReader::new(file))?;
    model.validate()?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use super::load_delay_model;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("courier_route_{}_{name}", std::process::id()))
    }

    #[test]
    fn loads_a_logistic_model_from_json() {
        let path = temp_path("model_ok.json");
        fs::write(
            &path,
            r#"{"intercept": -1.0, "cluster_weight": 0.25, "express_weight": 1.5}"#,
        )
        .expect("write model");

        let model = load_delay_model(&path);
        fs::remove_file(&path).expect("cleanup");

        assert!(model.is_some());
    }

    #[test]
    fn missing_file_yields_no_model() {
        assert!(load_delay_model(&temp_path("does_not_exist.json")).is_none());
    }

    #[test]
    fn malformed_file_yields_no_model() {
        let path = temp_path("model_bad.json");
        fs::write(&path, "not a model").expect("write model");

        let model = load_delay_model(&path);
        fs::remove_file(&path).expect("cleanup");

        assert!(model.is_none());
    }

    #[test]
    fn non_finite_weights_yield_no_model() {
        let path = temp_path("model_nan.json");
        fs::write(
            &path,
            r#"{"intercept": 0.0, "cluster_weight": 1e400, "express_weight": 0.0}"#,
        )
        .expect("write model");

        let model = load_delay_model(&path);
        fs::remove_file(&path).expect("cleanup");

        assert!(model.is_none());
    }
}
