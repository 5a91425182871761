use crate::infra::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use churn_predictor::error::AppError;
use churn_predictor::features::ValidationError;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use tracing::debug;

#[derive(Debug, Serialize)]
pub(crate) struct PredictResponse {
    pub(crate) success: bool,
    pub(crate) result: &'static str,
    pub(crate) confidence: String,
}

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict_endpoint))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
}

pub(crate) async fn index() -> Json<Value> {
    Json(json!({ "message": "Churn Prediction API is running!" }))
}

pub(crate) async fn healthcheck() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let schema = if state.service.is_degraded() {
        "degraded"
    } else {
        "loaded"
    };
    let payload = if ready {
        json!({ "status": "ready", "schema": schema })
    } else {
        json!({ "status": "initializing", "schema": schema })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let body = state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default();
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}

/// Unparseable JSON is a client error with the same body shape as a missing
/// field.
pub(crate) async fn predict_endpoint(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictResponse>, AppError> {
    let Json(body) =
        payload.map_err(|rejection| ValidationError::Malformed(rejection.body_text()))?;

    let verdict = state.service.predict_json(&body).await?;
    debug!(outcome = ?verdict.outcome, "prediction served");

    Ok(Json(PredictResponse {
        success: true,
        result: verdict.message(),
        confidence: verdict.confidence_label(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use churn_predictor::features::{AlignmentMode, FeatureAligner, FeatureSchema};
    use churn_predictor::prediction::{
        ClassOutput, Classifier, PredictionInvoker, RemoteScorer, RetryPolicy, ScoringError,
    };
    use churn_predictor::ChurnService;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    /// Flags month-to-month fiber customers as churners.
    struct RuleClassifier {
        width: usize,
        churn_column: usize,
    }

    impl Classifier for RuleClassifier {
        fn classify(&self, features: &[f64]) -> Result<ClassOutput, ScoringError> {
            if features.len() != self.width {
                return Err(ScoringError::DimensionMismatch {
                    expected: self.width,
                    actual: features.len(),
                });
            }
            let churn = features[self.churn_column] == 1.0;
            Ok(ClassOutput {
                label: i64::from(churn),
                churn_probability: Some(if churn { 0.7321 } else { 0.12 }),
            })
        }
    }

    fn schema() -> Arc<FeatureSchema> {
        Arc::new(
            FeatureSchema::from_columns([
                "SeniorCitizen",
                "gender_Female",
                "gender_Male",
                "Contract_Month-to-month",
                "Contract_One year",
                "Contract_Two year",
                "tenure_group_1 - 12",
                "tenure_group_13 - 24",
            ])
            .expect("valid schema"),
        )
    }

    fn local_state() -> AppState {
        let classifier = RuleClassifier {
            width: 8,
            churn_column: 3,
        };
        let service = ChurnService::new(
            FeatureAligner::new(schema(), AlignmentMode::OneHot),
            PredictionInvoker::local(Arc::new(classifier)),
        );
        let state = AppState::new(Arc::new(service));
        state.readiness.store(true, Ordering::Release);
        state
    }

    fn sample_body() -> Value {
        json!({
            "SeniorCitizen": 0,
            "MonthlyCharges": 29.85,
            "TotalCharges": "29.85",
            "gender": "Female",
            "Partner": "Yes",
            "Dependents": "No",
            "PhoneService": "No",
            "MultipleLines": "No phone service",
            "InternetService": "DSL",
            "OnlineSecurity": "No",
            "OnlineBackup": "Yes",
            "DeviceProtection": "No",
            "TechSupport": "No",
            "StreamingTV": "No",
            "StreamingMovies": "No",
            "Contract": "Month-to-month",
            "PaperlessBilling": "Yes",
            "PaymentMethod": "Electronic check",
            "tenure": 1
        })
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.expect("router responds");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .expect("request builds")
    }

    #[tokio::test]
    async fn index_reports_running() {
        let request = Request::builder()
            .uri("/")
            .body(Body::empty())
            .expect("request builds");
        let (status, body) = send(router(local_state()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Churn Prediction API is running!");
    }

    #[tokio::test]
    async fn predict_returns_verdict_and_confidence() {
        let (status, body) =
            send(router(local_state()), post_json(sample_body().to_string())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let result = body["result"].as_str().expect("result string");
        assert!(result.contains("churned") || result.contains("continue"));
        assert_eq!(result, "This customer is likely to be churned!!");
        assert_eq!(body["confidence"], "Confidence: 73.21");
    }

    #[tokio::test]
    async fn missing_field_is_a_client_error() {
        let mut payload = sample_body();
        payload.as_object_mut().expect("object").remove("gender");

        let (status, body) = send(router(local_state()), post_json(payload.to_string())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let message = body["error"].as_str().expect("error string");
        assert!(message.starts_with("Missing or invalid input: "));
        assert!(message.contains("gender"));
    }

    #[tokio::test]
    async fn unparseable_json_is_a_client_error() {
        let (status, body) = send(router(local_state()), post_json("{not json".to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]
            .as_str()
            .expect("error string")
            .starts_with("Missing or invalid input: "));
    }

    #[tokio::test]
    async fn readiness_reports_degraded_schema() {
        let service = ChurnService::new(
            FeatureAligner::degraded(AlignmentMode::OneHot),
            PredictionInvoker::local(Arc::new(RuleClassifier {
                width: 8,
                churn_column: 3,
            })),
        );
        let state = AppState::new(Arc::new(service));
        state.readiness.store(true, Ordering::Release);

        let request = Request::builder()
            .uri("/ready")
            .body(Body::empty())
            .expect("request builds");
        let (status, body) = send(router(state), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["schema"], "degraded");
    }

    #[tokio::test]
    async fn unreachable_remote_scorer_fails_the_request() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let scorer = RemoteScorer::new(
            format!("http://{addr}/score"),
            Duration::from_millis(500),
            RetryPolicy::none(),
        )
        .expect("client builds");
        let service = ChurnService::new(
            FeatureAligner::new(schema(), AlignmentMode::OneHot),
            PredictionInvoker::remote(scorer),
        );

        let (status, body) = send(
            router(AppState::new(Arc::new(service))),
            post_json(sample_body().to_string()),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.get("success").is_none());
        assert!(body["error"]
            .as_str()
            .expect("error string")
            .starts_with("scoring error"));
    }
}
