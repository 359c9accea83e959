use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use super::{ReportService, ReportView};

/// Lookback bounds exposed by the slider (one hour to one week).
pub const MIN_HOURS: u32 = 1;
pub const MAX_HOURS: u32 = 168;

const PAGE: &str = include_str!("page.html");

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ReportService>,
    pub default_hours: u32,
}

impl AppState {
    /// Configured lookback, kept inside the slider bounds.
    fn default_window(&self) -> u32 {
        self.default_hours.clamp(MIN_HOURS, MAX_HOURS)
    }
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub hours: Option<u32>,
}

/// Error body: `{ "error": "..." }`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        (status, Json(json!({ "error": msg }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/report", get(report))
        .route("/health", get(health))
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Html<String> {
    let hours = state.default_window();
    Html(
        PAGE.replace("{{MIN_HOURS}}", &MIN_HOURS.to_string())
            .replace("{{MAX_HOURS}}", &MAX_HOURS.to_string())
            .replace("{{DEFAULT_HOURS}}", &hours.to_string()),
    )
}

async fn report(
    State(state): State<AppState>,
    Query(q): Query<ReportQuery>,
) -> Result<Json<ReportView>, ApiError> {
    let hours = q.hours.unwrap_or_else(|| state.default_window());
    if !(MIN_HOURS..=MAX_HOURS).contains(&hours) {
        return Err(ApiError::BadRequest(format!(
            "hours must be between {MIN_HOURS} and {MAX_HOURS}"
        )));
    }

    Ok(Json(state.service.report(hours).await))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::schema::{CollectedCandle, Exchange, MarketRow};
    use crate::store::memory::MemoryStore;
    use crate::store::VolumeStore;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::NaiveDateTime;
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    struct DownStore;

    #[async_trait::async_trait]
    impl VolumeStore for DownStore {
        fn name(&self) -> &'static str {
            "down"
        }

        fn page_size(&self) -> usize {
            1000
        }

        async fn write_batch(&self, _rows: &[MarketRow]) -> Result<usize, StoreError> {
            Err(StoreError::Http("down".into()))
        }

        async fn read_page(
            &self,
            _threshold: NaiveDateTime,
            _offset: usize,
            _limit: usize,
        ) -> Result<Vec<MarketRow>, StoreError> {
            Err(StoreError::Http("connection refused".into()))
        }
    }

    fn app(store: Arc<dyn VolumeStore>) -> Router {
        router(AppState {
            service: Arc::new(ReportService::new(store, Duration::from_secs(60))),
            default_hours: 24,
        })
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn hours_outside_bounds_are_rejected() {
        for uri in ["/api/report?hours=0", "/api/report?hours=169"] {
            let (status, body) = get_json(app(Arc::new(MemoryStore::default())), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body["error"].as_str().unwrap().contains("168"));
        }
    }

    #[tokio::test]
    async fn out_of_range_default_is_clamped() {
        let app = router(AppState {
            service: Arc::new(ReportService::new(
                Arc::new(MemoryStore::default()),
                Duration::from_secs(60),
            )),
            default_hours: 500,
        });

        let (status, body) = get_json(app, "/api/report").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "empty");
        assert_eq!(body["hours"], 168);
    }

    #[tokio::test]
    async fn empty_window_reports_no_data() {
        let (status, body) =
            get_json(app(Arc::new(MemoryStore::default())), "/api/report?hours=1").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "empty");
    }

    #[tokio::test]
    async fn unreachable_store_reports_load_failure() {
        let (status, body) = get_json(app(Arc::new(DownStore)), "/api/report").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "load_failed");
        assert_eq!(body["hours"], 24);
    }

    #[tokio::test]
    async fn ready_report_carries_aggregates() {
        let store = Arc::new(MemoryStore::default());
        let now = crate::util::now_kst();
        for (exchange, market, price) in [
            (Exchange::Upbit, "KRW-BTC", 100.0),
            (Exchange::Upbit, "KRW-ETH", 50.0),
            (Exchange::Bithumb, "KRW-BTC", 80.0),
        ] {
            store
                .upsert(
                    exchange,
                    &[CollectedCandle {
                        market: market.into(),
                        datetime_kst: now,
                        traded_price: price,
                    }],
                )
                .await;
        }

        let (status, body) = get_json(app(store), "/api/report?hours=24").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
        assert_eq!(body["shares"][0]["exchange"], "upbit");
        assert_eq!(body["shares"][0]["traded_price"], 150.0);
        assert_eq!(body["shares"][1]["traded_price"], 80.0);
        assert_eq!(body["top"][0]["markets"][0]["market"], "KRW-BTC");
        assert_eq!(body["pivot"]["columns"], serde_json::json!(["upbit", "bithumb"]));
    }

    #[tokio::test]
    async fn page_exposes_bounded_slider() {
        let resp = app(Arc::new(MemoryStore::default()))
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();

        assert!(html.contains(r#"min="1""#));
        assert!(html.contains(r#"max="168""#));
        assert!(html.contains(r#"value="24""#));
        assert!(!html.contains("{{"));
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, body) = get_json(app(Arc::new(MemoryStore::default())), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
