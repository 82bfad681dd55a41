//! CRM API router — mounts donor, donation and segment endpoints under /api/v1.

use crate::handlers::{self, CrmState};
use crate::store::CrmStore;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

/// Build the CRM router with all endpoints.
/// Returns a Router that should be merged into the main app.
pub fn crm_router(store: Arc<CrmStore>, preview_limit: usize) -> Router {
    let state = CrmState {
        store,
        preview_limit,
    };

    Router::new()
        // Donors
        .route("/api/v1/donors", get(handlers::list_donors).post(handlers::create_donor))
        .route("/api/v1/donors/:id", get(handlers::get_donor).put(handlers::update_donor).delete(handlers::delete_donor))
        .route("/api/v1/donors/:id/segments", get(handlers::donor_segments))
        .route("/api/v1/donors/:id/donations", get(handlers::list_donations).post(handlers::record_donation))
        // Segments
        .route("/api/v1/segments", get(handlers::list_segments).post(handlers::create_segment))
        .route("/api/v1/segments/preview", post(handlers::preview_segment))
        .route("/api/v1/segments/fields", get(handlers::segment_fields))
        .route("/api/v1/segments/:id", get(handlers::get_segment).delete(handlers::delete_segment))
        .route("/api/v1/segments/:id/donors", get(handlers::segment_donors))
        // Audit log
        .route("/api/v1/audit-log", get(handlers::audit_log))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        crm_router(Arc::new(CrmStore::with_demo_data()), 50)
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_preview_returns_compiled_predicate() {
        let (status, body) = send(
            app(),
            "POST",
            "/api/v1/segments/preview",
            Some(json!({
                "rules": {"and": [
                    {"field": "totalGifts", "operator": "greaterThanOrEqual", "value": 2},
                    {"or": [{"field": "retentionRisk", "operator": "equals", "value": "HIGH"}]}
                ]}
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["predicate"],
            json!({"AND": [
                {"totalGifts": {"gte": 2}},
                {"OR": [{"retentionRisk": {"equals": "HIGH"}}]}
            ]})
        );
        // Alan Turing and Margaret Hamilton in the demo data.
        assert_eq!(body["matched"], json!(2));
    }

    #[tokio::test]
    async fn test_preview_unknown_field_is_bad_request() {
        let (status, body) = send(
            app(),
            "POST",
            "/api/v1/segments/preview",
            Some(json!({"rules": {"field": "shoeSize", "operator": "equals", "value": 9}})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("validation_failed"));
        assert!(body["message"].as_str().unwrap().contains("shoeSize"));
    }

    #[tokio::test]
    async fn test_create_segment_with_empty_group_is_rejected() {
        let (status, _) = send(
            app(),
            "POST",
            "/api/v1/segments",
            Some(json!({"name": "Nobody", "rules": {"or": []}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_segment_and_donation_flow() {
        let app = app();

        let (status, donor) = send(
            app.clone(),
            "POST",
            "/api/v1/donors",
            Some(json!({
                "email": "new.donor@example.org",
                "first_name": "New",
                "last_name": "Donor",
                "retention_risk": "LOW"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let donor_id = donor["id"].as_str().unwrap().to_string();

        let (status, segment) = send(
            app.clone(),
            "POST",
            "/api/v1/segments",
            Some(json!({
                "name": "Generous newcomers",
                "rules": {"and": [
                    {"field": "email", "operator": "startsWith", "value": "NEW."},
                    {"field": "totalAmount", "operator": "greaterThan", "value": 100}
                ]}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let segment_id = segment["id"].as_str().unwrap().to_string();

        let members_uri = format!("/api/v1/segments/{segment_id}/donors");
        let (_, members) = send(app.clone(), "GET", &members_uri, None).await;
        assert_eq!(members, json!([]));

        let (status, _) = send(
            app.clone(),
            "POST",
            &format!("/api/v1/donors/{donor_id}/donations"),
            Some(json!({"amount": 250.0, "campaign": "Spring Appeal"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, members) = send(app.clone(), "GET", &members_uri, None).await;
        assert_eq!(members.as_array().unwrap().len(), 1);
        assert_eq!(members[0]["id"], json!(donor_id));

        let (_, memberships) = send(app, "GET", &format!("/api/v1/donors/{donor_id}/segments"), None).await;
        assert_eq!(memberships[0]["name"], json!("Generous newcomers"));
    }

    #[tokio::test]
    async fn test_missing_entities_are_not_found() {
        let id = uuid::Uuid::new_v4();
        let (status, _) = send(app(), "GET", &format!("/api/v1/segments/{id}/donors"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(app(), "DELETE", &format!("/api/v1/donors/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_not_found_responses_carry_error_body() {
        let id = uuid::Uuid::new_v4();
        for (method, uri) in [
            ("GET", format!("/api/v1/donors/{id}")),
            ("DELETE", format!("/api/v1/donors/{id}")),
            ("GET", format!("/api/v1/segments/{id}")),
            ("DELETE", format!("/api/v1/segments/{id}")),
        ] {
            let (status, body) = send(app(), method, &uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
            assert_eq!(body["error"], json!("not_found"), "{method} {uri}");
            assert!(body["message"].as_str().unwrap().contains(&id.to_string()));
        }
    }

    #[tokio::test]
    async fn test_segment_without_rules_is_validation_failure() {
        let (status, body) = send(app(), "POST", "/api/v1/segments", Some(json!({"name": "x"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("validation_failed"));
        assert!(body["message"].as_str().unwrap().contains("rules"));
    }

    #[tokio::test]
    async fn test_malformed_json_bodies_are_validation_failures() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/segments/preview")
            .header("content-type", "application/json")
            .body(Body::from("{\"rules\": "))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], json!("validation_failed"));

        let (status, body) = send(
            app(),
            "POST",
            "/api/v1/donors",
            Some(json!({"email": "typed@example.org", "first_name": "A", "last_name": "B", "status": "active"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("validation_failed"));
    }

    #[tokio::test]
    async fn test_field_catalogue() {
        let (status, body) = send(app(), "GET", "/api/v1/segments/fields", None).await;
        assert_eq!(status, StatusCode::OK);
        let fields = body.as_array().unwrap();
        let status_field = fields.iter().find(|f| f["field"] == json!("status")).unwrap();
        assert_eq!(status_field["kind"], json!("enum"));
        assert_eq!(status_field["case_insensitive"], json!(false));
        assert_eq!(status_field["values"][0], json!("ACTIVE"));
        let email = fields.iter().find(|f| f["field"] == json!("email")).unwrap();
        assert_eq!(email["case_insensitive"], json!(true));
        assert!(email.get("values").is_none());
    }
}
