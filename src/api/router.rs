//! API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes sit at the root; every request gets a `TraceLayer` span.

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

pub fn api_router(ctx: ApiContext) -> Router {
    Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/list-folder", post(endpoints::folders::list))
        .route("/find-file", post(endpoints::files::find))
        .route("/process-file", post(endpoints::process::by_id))
        .route("/process-file-by-name", post(endpoints::process::by_name))
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, Response, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::storage::{ParentRef, SearchHit};
    use crate::testing::{
        entry, mock_processor, ocr_json, solid_png, text_ocr, MockOcr, MockStorage,
    };

    fn app(storage: MockStorage, ocr: MockOcr) -> Router {
        api_router(ApiContext::new(Arc::new(mock_processor(storage, ocr))))
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn response_json(response: Response<Body>) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 65536)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn invoice_storage() -> MockStorage {
        MockStorage::new()
            .with_folder(
                "42",
                vec![entry("9", "invoice.png", "file"), entry("10", "old", "folder")],
            )
            .with_file("9", solid_png(16, 16))
    }

    #[tokio::test]
    async fn health_reports_credentials_without_refreshing() {
        let response = app(MockStorage::new(), text_ocr("unused"))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], crate::config::APP_VERSION);
        assert_eq!(json["credentials"]["strategy"], "mock");
        assert_eq!(json["credentials"]["token_cached"], false);
    }

    #[tokio::test]
    async fn list_folder_returns_entries() {
        let response = app(invoice_storage(), text_ocr("unused"))
            .oneshot(post_json("/list-folder", json!({"folder_id": "42"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["entries"][0]["id"], "9");
        assert_eq!(json["entries"][0]["type"], "file");
        assert_eq!(json["entries"][1]["type"], "folder");
    }

    #[tokio::test]
    async fn list_folder_accepts_numeric_id() {
        let response = app(invoice_storage(), text_ocr("unused"))
            .oneshot(post_json("/list-folder", json!({"folder_id": 42})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_field_is_400() {
        let response = app(invoice_storage(), text_ocr("unused"))
            .oneshot(post_json("/list-folder", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"]["message"], "folder_id is required.");
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        let request = Request::builder()
            .method("POST")
            .uri("/process-file")
            .header("Content-Type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app(invoice_storage(), text_ocr("unused"))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn find_file_in_folder() {
        let response = app(invoice_storage(), text_ocr("unused"))
            .oneshot(post_json(
                "/find-file",
                json!({"filename": "invoice.png", "folder_id": "42"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(
            json,
            json!({"file_id": "9", "filename": "invoice.png", "parent_folder_id": "42"})
        );
    }

    #[tokio::test]
    async fn find_file_matches_name_with_surrounding_whitespace() {
        let storage = MockStorage::new().with_folder(
            "42",
            vec![entry("8", "invoice.png", "file"), entry("9", " invoice.png", "file")],
        );
        let response = app(storage, text_ocr("unused"))
            .oneshot(post_json(
                "/find-file",
                json!({"filename": " invoice.png", "folder_id": " 42 "}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["file_id"], "9");
        assert_eq!(json["filename"], " invoice.png");
    }

    #[tokio::test]
    async fn process_by_name_keeps_trailing_whitespace() {
        let storage = MockStorage::new()
            .with_folder("42", vec![entry("9", "scan.png ", "file")])
            .with_file("9", solid_png(16, 16));
        let response = app(storage, text_ocr("TOTAL: $42.00"))
            .oneshot(post_json(
                "/process-file-by-name",
                json!({"filename": "scan.png ", "parent_folder_id": "42"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_json(response).await["extracted_text"], "TOTAL: $42.00");
    }

    #[tokio::test]
    async fn find_file_without_folder_searches() {
        let storage = MockStorage::new().with_search_hits(vec![SearchHit {
            id: "9".into(),
            name: "invoice.png".into(),
            kind: "file".into(),
            parent: Some(ParentRef { id: "42".into() }),
        }]);
        let response = app(storage, text_ocr("unused"))
            .oneshot(post_json("/find-file", json!({"filename": "invoice.png"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_json(response).await["parent_folder_id"], "42");
    }

    #[tokio::test]
    async fn find_missing_file_is_404() {
        let response = app(invoice_storage(), text_ocr("unused"))
            .oneshot(post_json(
                "/find-file",
                json!({"filename": "receipt.png", "folder_id": "42"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response_json(response).await["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn process_file_returns_text() {
        let response = app(invoice_storage(), text_ocr("TOTAL: $42.00"))
            .oneshot(post_json("/process-file", json!({"file_id": "9"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response_json(response).await,
            json!({"extracted_text": "TOTAL: $42.00"})
        );
    }

    #[tokio::test]
    async fn process_by_name_returns_text() {
        let response = app(invoice_storage(), text_ocr("TOTAL: $42.00"))
            .oneshot(post_json(
                "/process-file-by-name",
                json!({"filename": "invoice.png", "parent_folder_id": 42}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_json(response).await["extracted_text"], "TOTAL: $42.00");
    }

    #[tokio::test]
    async fn process_by_name_requires_parent() {
        let response = app(invoice_storage(), text_ocr("unused"))
            .oneshot(post_json(
                "/process-file-by-name",
                json!({"filename": "invoice.png"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response_json(response).await["error"]["message"],
            "parent_folder_id is required."
        );
    }

    #[tokio::test]
    async fn ocr_processing_error_is_422_with_diagnostic() {
        let ocr = MockOcr::always(ocr_json(json!({
            "IsErroredOnProcessing": true,
            "ErrorMessage": "Unable to recognize the file type"
        })));
        let response = app(invoice_storage(), ocr)
            .oneshot(post_json("/process-file", json!({"file_id": "9"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "PROCESSING_FAILED");
        assert_eq!(json["error"]["details"], "Unable to recognize the file type");
    }

    #[tokio::test]
    async fn storage_rejection_is_502() {
        let storage = invoice_storage().rejecting_tokens(&["token-1", "token-2"]);
        let response = app(storage, text_ocr("unused"))
            .oneshot(post_json("/process-file", json!({"file_id": "9"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            response_json(response).await["error"]["code"],
            "STORAGE_AUTH_FAILED"
        );
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let response = app(MockStorage::new(), text_ocr("unused"))
            .oneshot(Request::get("/nonexistent").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
