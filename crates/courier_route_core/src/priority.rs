//! Per-stop delay-risk scoring on top of an opaque [`DelayModel`].

use std::panic::{AssertUnwindSafe, catch_unwind};

use ndarray::{Array2, Axis, Ix2};

use crate::{Error, Result, ServiceType, constants::NEUTRAL_PRIORITY, model::DelayModel};

/// Model input for one stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Feature {
    pub cluster_id: usize,
    pub service_type: ServiceType,
}

impl Feature {
    pub fn new(cluster_id: usize, service_type: ServiceType) -> Self {
        Self {
            cluster_id,
            service_type,
        }
    }
}

/// `[cluster_id, service_type_code]` per row.
pub fn feature_matrix(features: &[Feature]) -> Result<Array2<f64>> {
    let flat: Vec<f64> = features
        .iter()
        .flat_map(|f| [f.cluster_id as f64, f64::from(f.service_type.code())])
        .collect();
    Array2::from_shape_vec((features.len(), 2), flat)
        .map_err(|e| Error::model(format!("feature shape: {e}")))
}

/// Delay probability per feature. A two-dimensional probability output
/// contributes its second column; anything else defers to `predict`.
pub fn try_score(model: &dyn DelayModel, features: &[Feature]) -> Result<Vec<f64>> {
    let x = feature_matrix(features)?;
    let proba = model.predict_proba(x.view())?;

    let scores = if proba.ndim() == 2 {
        let proba = proba
            .into_dimensionality::<Ix2>()
            .map_err(|e| Error::model(e.to_string()))?;
        if proba.ncols() < 2 {
            return Err(Error::model(format!(
                "probability matrix has {} column(s), expected 2",
                proba.ncols()
            )));
        }
        proba.index_axis(Axis(1), 1).to_vec()
    } else {
        model.predict(x.view())?.to_vec()
    };

    if scores.len() != features.len() {
        return Err(Error::model(format!(
            "expected {} scores, got {}",
            features.len(),
            scores.len()
        )));
    }
    if let Some(bad) = scores.iter().find(|s| !(0.0..=1.0).contains(*s)) {
        return Err(Error::model(format!("score out of [0, 1]: {bad}")));
    }
    Ok(scores)
}

/// Never fails: without a model, or when inference goes wrong in any way,
/// every stop gets the neutral 0.5.
#[courier_route_derive::timer("priority.score")]
pub fn score_priority(model: Option<&dyn DelayModel>, features: &[Feature]) -> Vec<f64> {
    if features.is_empty() {
        return Vec::new();
    }
    let Some(model) = model else {
        log::debug!("priority: neutral n={} reason=no_model", features.len());
        return neutral(features.len());
    };

    match catch_unwind(AssertUnwindSafe(|| try_score(model, features))) {
        Ok(Ok(scores)) => {
            log::debug!("priority: scored n={}", scores.len());
            scores
        }
        Ok(Err(e)) => {
            log::warn!("priority: neutral n={} error={e}", features.len());
            neutral(features.len())
        }
        Err(_) => {
            log::warn!("priority: neutral n={} error=model panicked", features.len());
            neutral(features.len())
        }
    }
}

fn neutral(n: usize) -> Vec<f64> {
    vec![NEUTRAL_PRIORITY; n]
}
