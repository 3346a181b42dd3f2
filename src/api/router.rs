//! HTTP API router.
//!
//! Returns a composable `Router` with every route nested under `/api/`.
//! Share responses are marked `Cache-Control: no-store`; the extract
//! route carries its own upload body limit.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(core: Arc<CoreState>) -> Router {
    let max_upload_bytes = core.max_upload_bytes;
    let ctx = ApiContext::new(core);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let share_routes = Router::new()
        .route("/share", post(endpoints::share::create))
        .route("/share/:id", get(endpoints::share::fetch))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ));

    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route(
            "/extract",
            post(endpoints::extract::extract).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .merge(share_routes);

    Router::new()
        .nest("/api", api)
        .layer(cors)
        .with_state(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use tower::ServiceExt;

    use crate::models::{ExamRecord, Measurement, MeasurementStatus, PatientInfo};
    use crate::pipeline::extraction::{MockExtractionClient, MockReply};
    use crate::share::{ManualClock, ShareStore};

    const T0: i64 = 1_700_000_000;
    const BOUNDARY: &str = "exam-test-boundary";

    fn test_core() -> (Arc<CoreState>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(T0));
        let store = ShareStore::in_memory_with_clock(clock.clone()).unwrap();
        (Arc::new(CoreState::new(Arc::new(store))), clock)
    }

    fn core_with_mock(mock: Arc<MockExtractionClient>) -> Arc<CoreState> {
        let store = ShareStore::open_in_memory().unwrap();
        Arc::new(CoreState::new(Arc::new(store)).with_extractor(mock))
    }

    fn sample_record() -> ExamRecord {
        ExamRecord {
            exam_type: "Lipid Panel".into(),
            exam_date: "2025-02-14".into(),
            laboratory_or_clinic: "Northside Lab".into(),
            patient: PatientInfo {
                name: "Ana Souza".into(),
                age: "47".into(),
                gender: "F".into(),
                id: "P-2231".into(),
            },
            results: vec![Measurement {
                parameter: "LDL".into(),
                value: "162".into(),
                unit: "mg/dL".into(),
                reference_range: "< 130".into(),
                status: MeasurementStatus::High,
            }],
            physician: "Dr. Okafor".into(),
            notes: "".into(),
        }
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Host", "exams.test")
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn multipart_request(field: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = format!(
            concat!(
                "--{BOUNDARY}\r\n",
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"scan\"\r\n",
                "Content-Type: {content_type}\r\n\r\n",
            ),
            BOUNDARY = BOUNDARY,
            field = field,
            content_type = content_type,
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/extract")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn share_round_trip() {
        let (core, _clock) = test_core();
        let record = sample_record();

        let req = json_request(
            "POST",
            "/api/share",
            serde_json::json!({ "data": record, "expiresIn": 3600 }),
        );
        let response = api_router(core.clone()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("Cache-Control").unwrap(), "no-store");

        let created = body_json(response).await;
        let id = created["id"].as_str().unwrap().to_string();
        assert_eq!(created["url"], format!("https://exams.test/share/{id}"));
        assert_eq!(created["expiresAt"], "2023-11-14T23:13:20.000Z");

        let response = api_router(core)
            .oneshot(get_request(&format!("/api/share/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("Cache-Control").unwrap(), "no-store");

        let fetched = body_json(response).await;
        assert_eq!(fetched["expiresAt"], T0 + 3600);
        let data: ExamRecord = serde_json::from_value(fetched["data"].clone()).unwrap();
        assert_eq!(data, record);
    }

    #[tokio::test]
    async fn share_url_uses_configured_base() {
        let (core, _clock) = test_core();
        let core = Arc::new(
            CoreState::new(core.shares.clone())
                .with_public_base_url(Some("https://share.example.org".into())),
        );
        let req = json_request(
            "POST",
            "/api/share",
            serde_json::json!({ "data": {}, "expiresIn": 60 }),
        );
        let created = body_json(api_router(core).oneshot(req).await.unwrap()).await;
        let id = created["id"].as_str().unwrap();
        assert_eq!(created["url"], format!("https://share.example.org/share/{id}"));
    }

    #[tokio::test]
    async fn unknown_share_returns_404() {
        let (core, _clock) = test_core();
        let response = api_router(core)
            .oneshot(get_request("/api/share/does-not-exist"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert_eq!(json["error"]["message"], "Not found or expired");
    }

    #[tokio::test]
    async fn expired_share_looks_like_unknown() {
        let (core, clock) = test_core();
        let req = json_request(
            "POST",
            "/api/share",
            serde_json::json!({ "data": sample_record(), "expiresIn": 60 }),
        );
        let created = body_json(api_router(core.clone()).oneshot(req).await.unwrap()).await;
        let id = created["id"].as_str().unwrap().to_string();

        clock.advance(61);
        let expired = api_router(core.clone())
            .oneshot(get_request(&format!("/api/share/{id}")))
            .await
            .unwrap();
        let unknown = api_router(core)
            .oneshot(get_request("/api/share/never-existed"))
            .await
            .unwrap();

        assert_eq!(expired.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(expired).await, body_json(unknown).await);
    }

    #[tokio::test]
    async fn non_positive_ttl_returns_invalid_ttl() {
        let (core, _clock) = test_core();
        for ttl in [0, -5] {
            let req = json_request(
                "POST",
                "/api/share",
                serde_json::json!({ "data": sample_record(), "expiresIn": ttl }),
            );
            let response = api_router(core.clone()).oneshot(req).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_json(response).await["error"]["code"], "INVALID_TTL");
        }
        assert_eq!(core.shares.active_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn huge_ttl_returns_invalid_ttl_and_stores_nothing() {
        let (core, _clock) = test_core();
        let req = json_request(
            "POST",
            "/api/share",
            serde_json::json!({ "data": sample_record(), "expiresIn": 10_000_000_000_000_i64 }),
        );
        let response = api_router(core.clone()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "INVALID_TTL");
        assert_eq!(core.shares.active_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn malformed_share_body_returns_bad_request() {
        let (core, _clock) = test_core();
        for body in [
            serde_json::json!({ "data": sample_record() }),
            serde_json::json!({ "data": sample_record(), "expiresIn": "soon" }),
            serde_json::json!({ "expiresIn": 60 }),
        ] {
            let response = api_router(core.clone())
                .oneshot(json_request("POST", "/api/share", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_json(response).await["error"]["code"], "BAD_REQUEST");
        }
    }

    #[tokio::test]
    async fn extract_returns_normalized_record() {
        let mock = Arc::new(MockExtractionClient::new(
            concat!(
                "```json\n",
                "{\"exam_type\":\"CBC\",\"results\":[{\"parameter\":\"Hemoglobin\",",
                "\"value\":13.8,\"unit\":\"g/dL\",\"reference_range\":\"12-16\",",
                "\"status\":\"Normal\"}]}\n```",
            ),
        ));
        let core = core_with_mock(mock.clone());

        let response = api_router(core)
            .oneshot(multipart_request("image", "image/jpeg", b"\xFF\xD8\xFFfake-jpeg"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let record: ExamRecord = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(record.exam_type, "CBC");
        assert_eq!(record.results[0].value, "13.8");
        assert_eq!(record.results[0].status, MeasurementStatus::Normal);
        assert_eq!(record.physician, "");
        assert_eq!(mock.calls(), 1);
        assert_eq!(mock.last_media_type(), Some("image/jpeg"));
    }

    #[tokio::test]
    async fn extract_accepts_pdf() {
        let mock = Arc::new(MockExtractionClient::new("{\"exam_type\":\"MRI\"}"));
        let core = core_with_mock(mock.clone());
        let response = api_router(core)
            .oneshot(multipart_request("image", "application/pdf", b"%PDF-1.7"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(mock.last_media_type(), Some("application/pdf"));
    }

    #[tokio::test]
    async fn extract_rejects_unsupported_type() {
        let mock = Arc::new(MockExtractionClient::new("{}"));
        let core = core_with_mock(mock.clone());

        let response = api_router(core)
            .oneshot(multipart_request("image", "text/plain", b"hello"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "UNSUPPORTED_INPUT");
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn extract_without_file_returns_bad_request() {
        let mock = Arc::new(MockExtractionClient::new("{}"));
        let core = core_with_mock(mock.clone());

        let response = api_router(core)
            .oneshot(multipart_request("attachment", "image/png", b"png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "BAD_REQUEST");
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn extract_malformed_model_output_returns_502() {
        let mock = Arc::new(MockExtractionClient::new(
            "I'm sorry, I can't read this document.",
        ));
        let core = core_with_mock(mock);

        let response = api_router(core)
            .oneshot(multipart_request("image", "image/png", b"\x89PNG"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["error"]["code"], "MALFORMED_RESPONSE");
    }

    #[tokio::test]
    async fn extract_no_content_returns_502() {
        let mock = Arc::new(MockExtractionClient::with_reply(MockReply::NoContent));
        let response = api_router(core_with_mock(mock))
            .oneshot(multipart_request("image", "image/gif", b"GIF89a"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["error"]["code"], "NO_RESPONSE_CONTENT");
    }

    #[tokio::test]
    async fn extract_timeout_returns_504() {
        let mock = Arc::new(MockExtractionClient::with_reply(MockReply::Timeout(60)));
        let response = api_router(core_with_mock(mock))
            .oneshot(multipart_request("image", "image/webp", b"RIFF"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body_json(response).await["error"]["code"], "EXTRACTION_TIMEOUT");
    }

    #[tokio::test]
    async fn extract_without_client_returns_503() {
        let (core, _clock) = test_core();
        let response = api_router(core)
            .oneshot(multipart_request("image", "image/png", b"\x89PNG"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body_json(response).await["error"]["code"],
            "EXTRACTION_UNAVAILABLE"
        );
    }

    #[tokio::test]
    async fn extract_over_body_limit_returns_413() {
        let mock = Arc::new(MockExtractionClient::new("{}"));
        let store = ShareStore::open_in_memory().unwrap();
        let core = Arc::new(
            CoreState::new(Arc::new(store))
                .with_extractor(mock.clone())
                .with_max_upload_bytes(256),
        );

        let response = api_router(core)
            .oneshot(multipart_request("image", "image/png", &[0u8; 4096]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn health_reports_active_shares() {
        let (core, _clock) = test_core();
        core.shares.create(&sample_record(), 60).unwrap();

        let response = api_router(core)
            .oneshot(get_request("/api/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], crate::config::APP_VERSION);
        assert_eq!(json["active_shares"], 1);
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let (core, _clock) = test_core();
        let response = api_router(core)
            .oneshot(get_request("/api/nonexistent"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
