//! Remote model adapter
//!
//! Drives a black-box NLP model behind an HTTP endpoint. Each point name is
//! POSTed as JSON and the response is mapped back onto the label fields.
//! Responses with unknown field keys, or that echo back a different point
//! name than the one sent, are rejected as malformed rather than silently
//! scored.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use super::traits::{BuildingContext, ModelAdapter, Prediction};
use crate::dataset::LabelField;
use crate::error::InferenceError;
use crate::tokenize::ModelInput;

/// Request body sent to the model endpoint.
#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    point_label: &'a str,
    building_id: &'a str,
    tokens: &'a [String],
}

/// Response body expected from the model endpoint. `point_label`, when
/// present, must echo the request.
#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    point_label: Option<String>,
    #[serde(default)]
    labels: BTreeMap<String, String>,
    #[serde(default)]
    confidence: Option<f32>,
}

/// Adapter for a model served over HTTP.
pub struct HttpAdapter {
    name: String,
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpAdapter {
    /// Build the adapter. Fails when the client cannot be constructed, which
    /// callers treat as a configuration error before the run starts.
    pub fn new(name: &str, endpoint: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            name: name.to_string(),
            client,
            endpoint: endpoint.to_string(),
            timeout,
        })
    }

    /// Classify a transport failure. Timeouts carry the configured deadline
    /// so failure entries state the actual limit that was exceeded.
    fn transport_error(&self, err: reqwest::Error) -> InferenceError {
        if err.is_timeout() {
            InferenceError::Timeout(self.timeout)
        } else if err.is_decode() {
            InferenceError::MalformedResponse(err.to_string())
        } else {
            InferenceError::Backend(err.to_string())
        }
    }

    /// Map a response body onto a prediction, validating the echoed point
    /// name and every field key.
    fn map_response(
        response: PredictResponse,
        sent_point_label: &str,
    ) -> Result<Prediction, InferenceError> {
        if let Some(echoed) = &response.point_label {
            if echoed != sent_point_label {
                return Err(InferenceError::MalformedResponse(format!(
                    "response for '{echoed}' does not match request '{sent_point_label}'"
                )));
            }
        }

        let mut labels = BTreeMap::new();
        for (key, value) in response.labels {
            let field: LabelField = serde_json::from_value(serde_json::Value::String(key.clone()))
                .map_err(|_| {
                    InferenceError::MalformedResponse(format!("unknown label field '{key}'"))
                })?;
            if !value.is_empty() {
                labels.insert(field, value);
            }
        }

        let mut prediction = Prediction { labels, confidence: None };
        if let Some(confidence) = response.confidence {
            prediction = prediction.with_confidence(confidence.clamp(0.0, 1.0));
        }
        Ok(prediction)
    }
}

#[async_trait]
impl ModelAdapter for HttpAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn predict(
        &self,
        input: &ModelInput,
        ctx: BuildingContext<'_>,
    ) -> Result<Prediction, InferenceError> {
        let request = PredictRequest {
            point_label: &input.raw,
            building_id: ctx.building,
            tokens: &input.tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InferenceError::Backend(format!(
                "endpoint returned HTTP {status}"
            )));
        }

        let body: PredictResponse = response
            .json()
            .await
            .map_err(|err| self.transport_error(err))?;
        Self::map_response(body, &input.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> PredictResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_map_response_valid_labels() {
        let body = response(
            r#"{"point_label": "AHU1.SAT", "labels": {"equip": "AHU", "subcomp": "SAT"}, "confidence": 0.9}"#,
        );
        let prediction = HttpAdapter::map_response(body, "AHU1.SAT").unwrap();
        assert_eq!(prediction.get(LabelField::Equip), Some("AHU"));
        assert_eq!(prediction.get(LabelField::Subcomp), Some("SAT"));
        assert_eq!(prediction.confidence, Some(0.9));
    }

    #[test]
    fn test_map_response_rejects_unknown_field_key() {
        let body = response(r#"{"labels": {"gadget": "X"}}"#);
        match HttpAdapter::map_response(body, "AHU1.SAT") {
            Err(InferenceError::MalformedResponse(msg)) => {
                assert!(msg.contains("gadget"));
            }
            other => panic!("expected malformed response, got {other:?}"),
        }
    }

    #[test]
    fn test_map_response_rejects_point_label_mismatch() {
        let body = response(r#"{"point_label": "OTHER", "labels": {}}"#);
        assert!(matches!(
            HttpAdapter::map_response(body, "AHU1.SAT"),
            Err(InferenceError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_map_response_missing_echo_is_accepted() {
        let body = response(r#"{"labels": {"io_type": "AI"}}"#);
        let prediction = HttpAdapter::map_response(body, "AHU1.SAT").unwrap();
        assert_eq!(prediction.get(LabelField::IoType), Some("AI"));
        assert_eq!(prediction.confidence, None);
    }

    #[test]
    fn test_map_response_clamps_confidence() {
        let body = response(r#"{"labels": {}, "confidence": 1.7}"#);
        let prediction = HttpAdapter::map_response(body, "X").unwrap();
        assert_eq!(prediction.confidence, Some(1.0));
    }

    #[test]
    fn test_map_response_drops_empty_values() {
        let body = response(r#"{"labels": {"equip": ""}}"#);
        let prediction = HttpAdapter::map_response(body, "X").unwrap();
        assert!(prediction.labels.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_error_carries_configured_deadline() {
        use crate::tokenize::normalize;

        // A listener that accepts but never responds, so the request runs
        // into the client timeout.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}/predict", listener.local_addr().unwrap());

        let timeout = Duration::from_millis(100);
        let adapter = HttpAdapter::new("http", &endpoint, timeout).unwrap();
        let result = adapter
            .predict(&normalize("AHU1.SAT"), BuildingContext { building: "b1" })
            .await;

        match result {
            Err(InferenceError::Timeout(reported)) => assert_eq!(reported, timeout),
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
