use axum::{
    Json, Router,
    extract::{FromRequest, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::dashboard::{DashboardData, DashboardQuery, Insight, SummaryView};
use crate::downloader;
use crate::error::DashboardError;
use crate::period::{Frequency, PeriodBounds, PeriodSelection};
use crate::scheme::{Review, SchemeDraft, SchemePayload};
use crate::timeseries::transform_value;

pub struct AppState {
    config: Config,
}

/// `Json` extractor whose rejections come back as `{status, message}` JSON
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(DashboardError))]
struct ApiJson<T>(T);

impl From<JsonRejection> for DashboardError {
    fn from(rejection: JsonRejection) -> Self {
        DashboardError::Request {
            status: rejection.status().as_u16(),
            message: rejection.body_text(),
        }
    }
}

#[derive(Deserialize)]
struct PeriodRequest {
    frequency: Frequency,
    #[serde(default)]
    bounds: PeriodBounds,
}

#[derive(Serialize)]
struct PeriodResponse {
    #[serde(flatten)]
    selection: PeriodSelection,
    summary: String,
}

#[derive(Deserialize)]
struct InsightRequest {
    #[serde(default)]
    stats: Value,
    path: Vec<String>,
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

impl StatusResponse {
    fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            message: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message.into()),
        }
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = match &self {
            DashboardError::Query(_) | DashboardError::Upload(_) | DashboardError::Scheme(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            DashboardError::Request { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
            }
            DashboardError::Json(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(StatusResponse::error(self.to_string()))).into_response()
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.cors_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

/// Builds the API router
pub fn router(config: Config) -> Router {
    let cors = cors_layer(&config);
    let app_state = Arc::new(AppState { config });

    Router::new()
        .route("/api/health", get(health))
        .route("/api/periods", post(compute_periods))
        .route("/api/timeseries", post(transform_timeseries))
        .route("/api/timeseries/csv", post(export_csv))
        .route("/api/timeseries/xlsx", post(export_xlsx))
        .route("/api/summary", post(summarize))
        .route("/api/summary/insight", post(insight))
        .route("/api/dashboard/validate", post(validate_query))
        .route("/api/schemes/payload", post(scheme_payload))
        .route("/api/reviews/validate", post(validate_review))
        .layer(cors)
        .with_state(app_state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let address = config.bind_address();
    let app = router(config);

    // Start server
    let listener = TcpListener::bind(&address).await?;
    info!("Listening on http://{}", address);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "port": state.config.port,
    }))
}

async fn compute_periods(ApiJson(payload): ApiJson<PeriodRequest>) -> impl IntoResponse {
    let selection = PeriodSelection::compute(payload.frequency, &payload.bounds);
    let summary = selection.summary();
    Json(PeriodResponse { selection, summary })
}

async fn transform_timeseries(ApiJson(body): ApiJson<Value>) -> impl IntoResponse {
    Json(transform_value(&body))
}

async fn export_csv(ApiJson(body): ApiJson<Value>) -> Result<Response, DashboardError> {
    let csv = downloader::to_csv(&transform_value(&body))?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"timeseries.csv\""),
        ],
        csv,
    )
        .into_response())
}

async fn export_xlsx(ApiJson(body): ApiJson<Value>) -> Result<Response, DashboardError> {
    let buffer = downloader::to_xlsx(&transform_value(&body))?;
    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"timeseries.xlsx\""),
        ],
        buffer,
    )
        .into_response())
}

async fn summarize(ApiJson(body): ApiJson<Value>) -> impl IntoResponse {
    let data = DashboardData::from_response(&body);
    Json(SummaryView::build(&data))
}

async fn insight(ApiJson(payload): ApiJson<InsightRequest>) -> Response {
    match Insight::lookup(&payload.stats, &payload.path) {
        Some(found) => Json(found).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(StatusResponse::error("No insights found for this item")),
        )
            .into_response(),
    }
}

async fn validate_query(
    ApiJson(query): ApiJson<DashboardQuery>,
) -> Result<Json<StatusResponse>, DashboardError> {
    query.validate()?;
    Ok(Json(StatusResponse::ok()))
}

async fn scheme_payload(
    ApiJson(draft): ApiJson<SchemeDraft>,
) -> Result<Json<SchemePayload>, DashboardError> {
    Ok(Json(draft.payload()?))
}

async fn validate_review(ApiJson(review): ApiJson<Review>) -> Result<Json<StatusResponse>, DashboardError> {
    review.decision.validate()?;
    info!("review of record {} accepted", review.id);
    Ok(Json(StatusResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    async fn send(method: &str, uri: &str, body: Option<String>) -> (StatusCode, String, Vec<u8>) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.map(Body::from).unwrap_or_else(Body::empty))
            .unwrap();
        let response = router(Config::default()).oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, bytes.to_vec())
    }

    async fn post(uri: &str, body: Value) -> (StatusCode, String, Value) {
        let (status, content_type, bytes) = send("POST", uri, Some(body.to_string())).await;
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, content_type, value)
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, _, bytes) = send("GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["port"], 3000);
    }

    #[tokio::test]
    async fn periods_include_a_summary() {
        let (status, _, body) = post(
            "/api/periods",
            json!({"frequency": "Daily", "bounds": {"year": "2024", "month": "02"}}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 29);
        assert_eq!(body["summary"], "29 day(s) selected");
        assert_eq!(body["periods"][0], "2024-02-01");
    }

    #[tokio::test]
    async fn validate_accepts_blank_frequency() {
        let (status, _, body) = post(
            "/api/dashboard/validate",
            json!({"scheme_code": "S", "state_code": "27", "frequency": ""}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn validate_failure_is_json_422() {
        let (status, content_type, body) =
            post("/api/dashboard/validate", json!({"scheme_code": "S"})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(content_type.starts_with("application/json"));
        assert_eq!(body["status"], "error");
        assert!(body["message"].as_str().unwrap().contains("State"));
    }

    #[tokio::test]
    async fn unreadable_bodies_are_json_errors() {
        let (status, content_type, body) = post(
            "/api/dashboard/validate",
            json!({"scheme_code": "S", "state_code": "27", "frequency": "hourly"}),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(content_type.starts_with("application/json"));
        assert_eq!(body["status"], "error");

        let (status, content_type, bytes) =
            send("POST", "/api/summary", Some("{not json".to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(content_type.starts_with("application/json"));
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn insight_miss_is_404() {
        let stats = json!({"region": {"male": {"mean": 2.5}}});
        let (status, _, body) = post(
            "/api/summary/insight",
            json!({"stats": stats, "path": ["region", "male"]}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["breadcrumb"], "region › male");

        let (status, _, body) = post(
            "/api/summary/insight",
            json!({"stats": stats, "path": ["region", "female"]}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn summary_and_timeseries_shapes() {
        let (_, _, body) = post(
            "/api/summary",
            json!({"merged": {"region": {"male": 10, "female": 8}, "total": 18}}),
        )
        .await;
        assert_eq!(body["sections"][0]["title"], "Overview");
        assert_eq!(body["sections"][1]["pathMap"]["male"], json!(["region", "male"]));

        let (_, _, body) = post(
            "/api/timeseries",
            json!([{"period": "Jan", "ts": 2, "data": {"a": 1}}, {"period": "Feb", "ts": 1, "data": {"b": 3}}]),
        )
        .await;
        assert_eq!(body["keys"], json!(["a", "b"]));
        assert_eq!(body["rows"][0]["period"], "Feb");
    }

    #[tokio::test]
    async fn csv_export_is_an_attachment() {
        let body = json!([{"period": "2024", "ts": 1, "data": {"a": 2}}]);
        let request = Request::builder()
            .method("POST")
            .uri("/api/timeseries/csv")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router(Config::default()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        assert!(
            response.headers()[header::CONTENT_DISPOSITION]
                .to_str()
                .unwrap()
                .contains("timeseries.csv")
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"period,ts,a\n2024,1,2\n");
    }

    #[tokio::test]
    async fn xlsx_export_is_a_workbook() {
        let (status, content_type, bytes) = send(
            "POST",
            "/api/timeseries/xlsx",
            Some(json!([{"period": "2024", "ts": 1, "data": {"a": 2}}]).to_string()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.contains("spreadsheetml"));
        assert_eq!(&bytes[..2], b"PK");
    }

    #[tokio::test]
    async fn scheme_payload_and_review_checks() {
        let (status, _, body) = post("/api/schemes/payload", json!({"scheme_name": "X"})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["message"].as_str().unwrap().contains("Frequency"));

        let (status, _, body) = post(
            "/api/schemes/payload",
            json!({
                "scheme_name": "X",
                "frequency": "Yearly",
                "state_code": "27",
                "categories": [
                    {"id": 1, "name": "People"},
                    {"id": 2, "parent_id": 1, "name": "Male"}
                ]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["division_code"], Value::Null);
        assert_eq!(body["categories"][0]["children"][0]["category_name"], "Male");

        let (status, _, body) = post(
            "/api/reviews/validate",
            json!({"id": 4, "action": "reject", "remark": "  "}),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["message"], "Invalid scheme: Please enter rejection remark");

        let (status, _, _) = post("/api/reviews/validate", json!({"id": 4, "action": "approve"})).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[test]
    fn cors_accepts_listed_origins() {
        let config = Config {
            cors_origins: vec!["http://localhost:5173".into(), "bad\norigin".into()],
            ..Config::default()
        };
        let _ = cors_layer(&config);
    }
}
