use crate::features::FeatureValue;
use crate::prediction::error::{ModelError, ScoringError};
use crate::prediction::retry::RetryPolicy;
use crate::prediction::verdict::ClassOutput;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Scores rows against an external endpoint that takes `[[f1, f2, ...]]`
/// and answers with `[label, ...]`.
#[derive(Debug, Clone)]
pub struct RemoteScorer {
    client: Client,
    endpoint: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl RemoteScorer {
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ModelError::Client)?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout,
            retry,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub async fn score(&self, row: &[FeatureValue]) -> Result<ClassOutput, ScoringError> {
        let mut attempt = 1u32;
        loop {
            match self.score_once(row).await {
                Ok(output) => return Ok(output),
                Err(err) => {
                    if !err.is_transient() || attempt >= self.retry.attempts() {
                        return Err(err);
                    }

                    let delay = self.retry.next_delay(attempt.saturating_sub(1));
                    warn!(
                        endpoint = %self.endpoint,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "scoring call failed, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn score_once(&self, row: &[FeatureValue]) -> Result<ClassOutput, ScoringError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&[row])
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScoringError::Status {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await.map_err(|err| {
            if err.is_timeout() {
                self.transport_error(err)
            } else {
                self.malformed(format!("body is not JSON ({err})"))
            }
        })?;

        let label = parse_label(&body).map_err(|detail| self.malformed(detail))?;
        debug!(endpoint = %self.endpoint, label, "remote scoring succeeded");

        Ok(ClassOutput {
            label,
            churn_probability: None,
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> ScoringError {
        if err.is_timeout() {
            ScoringError::Timeout {
                endpoint: self.endpoint.clone(),
                timeout: self.timeout,
            }
        } else {
            ScoringError::Unavailable {
                endpoint: self.endpoint.clone(),
                source: err,
            }
        }
    }

    fn malformed(&self, detail: String) -> ScoringError {
        ScoringError::MalformedResponse {
            endpoint: self.endpoint.clone(),
            detail,
        }
    }
}

fn parse_label(body: &Value) -> Result<i64, String> {
    let first = body
        .as_array()
        .ok_or_else(|| "expected a JSON array".to_string())?
        .first()
        .ok_or_else(|| "prediction array is empty".to_string())?;

    let label = match first {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|value| value.fract() == 0.0)
                .map(|value| value as i64)
        }),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        Value::Bool(flag) => Some(i64::from(*flag)),
        _ => None,
    };

    label.ok_or_else(|| format!("first element {first} is not a class label"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn label_accepts_integers_floats_and_strings() {
        assert_eq!(parse_label(&json!([1])), Ok(1));
        assert_eq!(parse_label(&json!([0.0, 0.3])), Ok(0));
        assert_eq!(parse_label(&json!(["1"])), Ok(1));
    }

    #[test]
    fn label_rejects_unexpected_shapes() {
        assert!(parse_label(&json!({"label": 1})).is_err());
        assert!(parse_label(&json!([])).is_err());
        assert!(parse_label(&json!([0.4])).is_err());
        assert!(parse_label(&json!([null])).is_err());
    }
}
