use std::time::Duration;

use serde_json::json;
use url::Url;
use vidreview_core::{
    ApiError, BackendClient, ProcessingState, ReviewDecision, ReviewOutcome, ReviewState,
    UploadUrlRequest,
};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> BackendClient {
    BackendClient::new(
        Url::parse(&server.uri()).expect("mock server uri"),
        Duration::from_secs(5),
    )
    .expect("build client")
}

fn upload_request() -> UploadUrlRequest {
    UploadUrlRequest {
        file_name: "final.mp4".into(),
        content_type: "video/mp4".into(),
        description: "Final".into(),
        club_id: None,
        duration_seconds: 125.4,
    }
}

#[tokio::test]
async fn posts_upload_url_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload-url"))
        .and(body_json(json!({
            "nombre_archivo": "final.mp4",
            "content_type": "video/mp4",
            "descripcion": "Final",
            "club_id": null,
            "duracion": 125.4
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "upload_url": "https://storage.example/uploads/final.mp4?X-Goog-Signature=1",
            "object_name": "uploads/20261018T120000_final.mp4",
            "video_id": 31
        })))
        .expect(1)
        .mount(&server)
        .await;

    let target = client(&server)
        .request_upload_url(&upload_request())
        .await
        .unwrap();
    assert_eq!(
        target.upload_url,
        "https://storage.example/uploads/final.mp4?X-Goog-Signature=1"
    );
    assert_eq!(target.video_id, Some(31));
}

#[tokio::test]
async fn upload_url_rejection_carries_reason() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload-url"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "upload_url_error"})))
        .mount(&server)
        .await;

    let err = client(&server)
        .request_upload_url(&upload_request())
        .await
        .unwrap_err();
    match err {
        ApiError::ServerRejected { status, reason } => {
            assert_eq!(status, 500);
            assert_eq!(reason.as_deref(), Some("upload_url_error"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn upload_url_without_target_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload-url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"upload_url": ""})))
        .mount(&server)
        .await;

    let err = client(&server)
        .request_upload_url(&upload_request())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let client = BackendClient::new(
        Url::parse("http://127.0.0.1:9").unwrap(),
        Duration::from_secs(2),
    )
    .unwrap();
    let err = client.request_upload_url(&upload_request()).await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
}

#[tokio::test]
async fn fetches_signed_playback_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/videos/42/signed-url"))
        .and(header("cache-control", "no-store"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "url": "https://storage.example/v42?sig=fresh",
            "mode": "SIGNED"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let url = client(&server).signed_playback_url(42).await.unwrap();
    assert_eq!(url.as_deref(), Some("https://storage.example/v42?sig=fresh"));

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].url.query().unwrap_or_default().starts_with("ts="));
}

#[tokio::test]
async fn missing_playback_url_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/videos/5/signed-url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"url": null, "mode": "DIRECT"})))
        .mount(&server)
        .await;

    assert_eq!(client(&server).signed_playback_url(5).await.unwrap(), None);
}

#[tokio::test]
async fn accept_without_redirect_yields_receipt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/videos/7/aceptar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"estado": "aceptado"})))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client(&server)
        .review(7, ReviewDecision::Accept)
        .await
        .unwrap();
    let ReviewOutcome::Applied(receipt) = outcome else {
        panic!("expected applied review");
    };
    assert_eq!(receipt.video_id, 7);
    assert_eq!(receipt.state, ReviewState::Accepted);
    assert_eq!(receipt.badge, "Aceptado");
    assert!(receipt.message.starts_with("Aceptado el "));
}

#[tokio::test]
async fn reject_with_redirect_asks_for_reload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/videos/7/rechazar"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/admin/videos/7"))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client(&server)
        .review(7, ReviewDecision::Reject)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        ReviewOutcome::Redirected {
            location: Some("/admin/videos/7".into())
        }
    );
}

#[tokio::test]
async fn review_failure_uses_default_reason() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/videos/8/aceptar"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client(&server)
        .review(8, ReviewDecision::Accept)
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "No se pudo aceptar el video");
}

#[tokio::test]
async fn review_failure_relays_backend_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/videos/404/rechazar"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Video not found"})))
        .mount(&server)
        .await;

    let err = client(&server)
        .review(404, ReviewDecision::Reject)
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Video not found");
}

#[tokio::test]
async fn fetches_statuses_for_visible_ids() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/videos/status"))
        .and(query_param("ids", "1,2,3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "videos": [
                {"id": 1, "estado": "aceptado", "estado_ia": "completado"},
                {"id": 2, "estado": "sin-revisar", "estado_ia": "procesando"},
                {"id": 3, "estado": "rechazado", "estado_ia": "error"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let statuses = client(&server).fetch_statuses(&[1, 2, 3]).await.unwrap();
    assert_eq!(statuses.len(), 3);
    assert_eq!(statuses[0].review, ReviewState::Accepted);
    assert_eq!(statuses[1].processing, ProcessingState::Processing);
    assert_eq!(statuses[2].processing, ProcessingState::Error);
}

#[tokio::test]
async fn empty_status_query_sends_nothing() {
    let server = MockServer::start().await;
    let statuses = client(&server).fetch_statuses(&[]).await.unwrap();
    assert!(statuses.is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn forwards_configured_user_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/videos/1/signed-url"))
        .and(header("X-User-Id", "17"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"url": "https://s/v1"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server).with_user_id(Some("17".into()));
    assert!(client.signed_playback_url(1).await.unwrap().is_some());
}

#[tokio::test]
async fn base_url_prefix_is_kept_for_every_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/app/admin/videos/9/aceptar"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/app/admin/videos/status"))
        .and(query_param("ids", "9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "videos": [{"id": 9, "estado": "aceptado", "estado_ia": "completado"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let base = Url::parse(&format!("{}/app", server.uri())).unwrap();
    let client = BackendClient::new(base, Duration::from_secs(5)).unwrap();

    let outcome = client.review(9, ReviewDecision::Accept).await.unwrap();
    assert!(matches!(outcome, ReviewOutcome::Applied(_)));
    let videos = client.fetch_statuses(&[9]).await.unwrap();
    assert_eq!(videos[0].review, ReviewState::Accepted);
}
