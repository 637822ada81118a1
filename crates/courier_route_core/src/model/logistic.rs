use ndarray::{Array1, Array2, ArrayD, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::DelayModel;
use crate::{Error, Result};

const FEATURE_COLUMNS: usize = 2;

/// Two-feature logistic regression:
/// `p(delay) = sigmoid(intercept + cluster_weight * cluster + express_weight * express)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogisticDelayModel {
    pub intercept: f64,
    pub cluster_weight: f64,
    pub express_weight: f64,
}

impl LogisticDelayModel {
    pub fn new(intercept: f64, cluster_weight: f64, express_weight: f64) -> Self {
        Self {
            intercept,
            cluster_weight,
            express_weight,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if [self.intercept, self.cluster_weight, self.express_weight]
            .iter()
            .all(|w| w.is_finite())
        {
            Ok(())
        } else {
            Err(Error::model("weights must be finite"))
        }
    }

    fn delay_probability(&self, features: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        if features.ncols() != FEATURE_COLUMNS {
            return Err(Error::model(format!(
                "expected {FEATURE_COLUMNS} feature columns, got {}",
                features.ncols()
            )));
        }
        Ok(features.map_axis(Axis(1), |row| {
            let z = self.intercept + self.cluster_weight * row[0] + self.express_weight * row[1];
            1.0 / (1.0 + (-z).exp())
        }))
    }
}

impl DelayModel for LogisticDelayModel {
    fn predict_proba(&self, features: ArrayView2<'_, f64>) -> Result<ArrayD<f64>> {
        let p = self.delay_probability(features)?;
        let mut out = Array2::zeros((p.len(), 2));
        for (mut row, p) in out.rows_mut().into_iter().zip(p.iter()) {
            row[0] = 1.0 - p;
            row[1] = *p;
        }
        Ok(out.into_dyn())
    }

    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        Ok(self
            .delay_probability(features)?
            .mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }
}
