//! ML inference adapter (spec §4.4 "PREDICTING_THROUGHPUT"; §9 Design Notes
//! "pluggable ML inference adapter").

use std::future::Future;

use nwdaf_messages::MlModelAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictError {
    /// Model URL not yet received from MTLF (spec §7 `InferenceUnavailable`).
    #[error("no model has been provisioned yet")]
    NotReady,

    #[error("inference request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// The six-feature input vector reshaped by the caller to `(1, 1, 6)`
/// before being handed to the model (spec §4.4).
#[derive(Debug, Clone, Copy)]
pub struct ThroughputFeatures {
    pub latitude: f64,
    pub longitude: f64,
    pub lte_rsrp: f64,
    pub nr_ss_rsrp: f64,
    pub h_speed: f64,
    pub bearing: u32,
}

impl ThroughputFeatures {
    fn as_vec(self) -> Vec<f64> {
        vec![
            self.latitude,
            self.longitude,
            self.lte_rsrp,
            self.nr_ss_rsrp,
            self.h_speed,
            f64::from(self.bearing),
        ]
    }
}

/// Abstraction over "call the provisioned model"; the reference system does
/// this over HTTP, but keeping it behind a trait lets tests substitute a
/// fixed-output predictor without a network stack. Callers are generic over
/// `Predictor` rather than boxing it as a trait object.
pub trait Predictor: Send + Sync {
    fn predict(
        &self,
        features: ThroughputFeatures,
    ) -> impl Future<Output = Result<f64, PredictError>> + Send;
}

/// Calls the model URL supplied by MTLF's `MLEventNotif::m_l_file_addr`.
pub struct HttpPredictor {
    client: reqwest::Client,
    model_addr: tokio::sync::RwLock<Option<MlModelAddr>>,
}

impl HttpPredictor {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            model_addr: tokio::sync::RwLock::new(None),
        }
    }

    /// Called once the `Data.MLModelProvisionDelivery.UE_LOC_THROUGHPUT`
    /// notification arrives (spec §4.4 "ML model provisioning").
    pub async fn set_model_addr(&self, addr: MlModelAddr) {
        *self.model_addr.write().await = Some(addr);
    }

    pub async fn is_ready(&self) -> bool {
        self.model_addr.read().await.is_some()
    }
}

impl Default for HttpPredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl Predictor for HttpPredictor {
    async fn predict(&self, features: ThroughputFeatures) -> Result<f64, PredictError> {
        let addr = self
            .model_addr
            .read()
            .await
            .clone()
            .ok_or(PredictError::NotReady)?;

        let response = self
            .client
            .post(&addr.m_l_model_url)
            .json(&serde_json::json!({ "instances": [[features.as_vec()]] }))
            .send()
            .await?
            .error_for_status()?;

        let body: serde_json::Value = response.json().await?;
        let prediction = body
            .get("predictions")
            .and_then(|v| v.as_array())
            .and_then(|v| v.first())
            .and_then(|v| v.as_array())
            .and_then(|v| v.first())
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);

        // The model may emit a signed artifact; only the magnitude is
        // meaningful as a throughput estimate (spec §4.4).
        Ok(prediction.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPredictor(f64);

    impl Predictor for FixedPredictor {
        async fn predict(&self, _features: ThroughputFeatures) -> Result<f64, PredictError> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn fixed_predictor_returns_configured_value() {
        let predictor = FixedPredictor(42.0);
        let features = ThroughputFeatures {
            latitude: 0.0,
            longitude: 0.0,
            lte_rsrp: -90.0,
            nr_ss_rsrp: -80.0,
            h_speed: 1.0,
            bearing: 90,
        };
        assert_eq!(predictor.predict(features).await.unwrap(), 42.0);
    }

    #[tokio::test]
    async fn unprovisioned_predictor_reports_not_ready() {
        let predictor = HttpPredictor::new();
        assert!(!predictor.is_ready().await);
        let features = ThroughputFeatures {
            latitude: 0.0,
            longitude: 0.0,
            lte_rsrp: 0.0,
            nr_ss_rsrp: 0.0,
            h_speed: 0.0,
            bearing: 0,
        };
        assert!(matches!(
            predictor.predict(features).await,
            Err(PredictError::NotReady)
        ));
    }
}
