use super::common::*;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router responds");
    let status = response.status();
    (status, read_json_body(response).await)
}

async fn open_draft(router: &Router) -> u64 {
    let (status, body) = send(
        router,
        request(
            Method::POST,
            "/api/v1/applications",
            Some(json!({ "scheme_id": 5 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["application"]["id"].as_u64().expect("application id")
}

fn complete_payload() -> Value {
    json!({
        "full_name": "Asha Verma",
        "date_of_birth": "2003-04-12",
        "phone_number": "+91 98765 43210",
        "qualification": "Undergraduate",
        "email": "asha@example.org",
        "aadhaar_number": "1234 5678 9012",
        "nationality": "Indian",
        "category": "General",
        "income": 180000.0,
        "documents": [{ "name": "Marksheet", "url": "https://files.example.org/marksheet.pdf" }],
        "addresses": [{
            "type": "permanent",
            "street": "12 MG Road",
            "city": "Pune",
            "state": "Maharashtra",
            "pincode": "411001",
            "country": "India"
        }],
        "education_history": [{
            "degree": "B.Sc",
            "university": "University of Pune",
            "course": "Physics",
            "year_of_passing": 2024,
            "grade": "A"
        }]
    })
}

#[tokio::test]
async fn rejects_missing_credentials() {
    let router = build_router();
    let response = router
        .oneshot(
            Request::get("/api/v1/applications")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "missing or invalid authorization header");
}

#[tokio::test]
async fn rejects_wrong_password() {
    let router = build_router();
    let (status, body) = send(
        &router,
        request_as("asha", "guess", Method::GET, "/api/v1/applications", None),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid username or password");
}

#[tokio::test]
async fn rejects_undecodable_credentials() {
    let router = build_router();
    let response = router
        .oneshot(
            Request::get("/api/v1/applications")
                .header(header::AUTHORIZATION, "Basic not-base64!")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn empty_listing_is_not_found() {
    let router = build_router();
    let (status, body) = send(
        &router,
        request(Method::GET, "/api/v1/applications", None),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "no applications found for this user");
}

#[tokio::test]
async fn initialize_returns_created_draft() {
    let router = build_router();
    let id = open_draft(&router).await;

    let (status, body) = send(
        &router,
        request(Method::GET, &format!("/api/v1/applications/{id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["application"]["is_draft"], true);
    assert_eq!(body["application"]["status"], "draft");
    assert_eq!(body["application"]["scheme_id"], 5);

    let (status, body) = send(
        &router,
        request(Method::GET, "/api/v1/applications", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn duplicate_initialize_conflicts() {
    let router = build_router();
    open_draft(&router).await;

    let (status, body) = send(
        &router,
        request(
            Method::POST,
            "/api/v1/applications",
            Some(json!({ "scheme_id": 5 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "application already exists for scheme 5");
}

#[tokio::test]
async fn unknown_scheme_is_not_found() {
    let router = build_router();
    let (status, _) = send(
        &router,
        request(
            Method::POST,
            "/api/v1/applications",
            Some(json!({ "scheme_id": 404 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_initialize_body_is_bad_request() {
    let router = build_router();
    let (status, body) = send(
        &router,
        request(
            Method::POST,
            "/api/v1/applications",
            Some(json!({ "scheme_id": "five" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn full_lifecycle_over_http() {
    let router = build_router();
    let id = open_draft(&router).await;
    let base = format!("/api/v1/applications/{id}");

    let (status, body) = send(
        &router,
        request(Method::PUT, &base, Some(complete_payload())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile"]["aadhaar_number"], "1234 5678 9012");
    assert_eq!(body["profile"]["addresses"][0]["pincode"], "411001");
    assert_eq!(body["merge"]["documents"]["created"], 1);
    assert!(body["advisory"].is_null());

    let (status, body) = send(
        &router,
        request(Method::POST, &format!("{base}/submit"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["application"]["status"], "submitted");
    assert!(body["application"]["submitted_at"].is_string());

    let (status, body) = send(
        &router,
        request(Method::GET, &format!("{base}/status"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "submitted");
    assert_eq!(body["message"], "application status is submitted");

    let (status, _) = send(
        &router,
        request(Method::PUT, &base, Some(json!({ "email": "late@example.org" }))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &router,
        request(Method::POST, &format!("{base}/withdraw"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["application"]["is_draft"], true);

    let (status, body) = send(
        &router,
        request(Method::POST, &format!("{base}/withdraw"), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "draft applications cannot be withdrawn");
}

#[tokio::test]
async fn incomplete_submit_names_the_field() {
    let router = build_router();
    let id = open_draft(&router).await;

    let (status, body) = send(
        &router,
        request(
            Method::POST,
            &format!("/api/v1/applications/{id}/submit"),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "full_name");
    assert_eq!(body["error"], "application is incomplete: full name is missing");
}

#[tokio::test]
async fn other_users_cannot_see_an_application() {
    let router = build_router();
    let id = open_draft(&router).await;

    let (status, _) = send(
        &router,
        request_as(
            "ravi",
            "hunter2",
            Method::GET,
            &format!("/api/v1/applications/{id}"),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &router,
        request_as(
            "ravi",
            "hunter2",
            Method::POST,
            &format!("/api/v1/applications/{id}/submit"),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_edit_checks_ownership_first() {
    let router = build_router();
    let id = open_draft(&router).await;
    let broken = |uri: String| {
        Request::builder()
            .method(Method::PUT)
            .uri(uri)
            .header(header::AUTHORIZATION, basic_auth("asha", "s3cret"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"income\": "))
            .expect("request builds")
    };

    let (status, _) = send(&router, broken("/api/v1/applications/99".to_string())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&router, broken(format!("/api/v1/applications/{id}"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn advisory_note_accompanies_inconsistent_edit() {
    let router = build_router();
    let id = open_draft(&router).await;

    let (status, body) = send(
        &router,
        request(
            Method::PUT,
            &format!("/api/v1/applications/{id}"),
            Some(json!({
                "addresses": [{ "type": "permanent", "street": "12 MG Road", "state": "Maharashtra", "pincode": "411001" }]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["advisory"]["field"], "addresses.permanent.city");
}

#[tokio::test]
async fn null_collections_leave_profile_untouched() {
    let router = build_router();
    let id = open_draft(&router).await;
    let base = format!("/api/v1/applications/{id}");

    let (status, _) = send(
        &router,
        request(Method::PUT, &base, Some(complete_payload())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &router,
        request(
            Method::PUT,
            &base,
            Some(json!({
                "full_name": "Asha",
                "documents": null,
                "addresses": null,
                "education_history": null
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile"]["full_name"], "Asha");
    assert_eq!(body["profile"]["documents"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["profile"]["addresses"].as_array().map(Vec::len), Some(1));
    assert_eq!(
        body["profile"]["education_history"].as_array().map(Vec::len),
        Some(1)
    );
}

#[tokio::test]
async fn date_of_birth_accepts_rfc3339_timestamps() {
    let router = build_router();
    let id = open_draft(&router).await;

    let (status, body) = send(
        &router,
        request(
            Method::PUT,
            &format!("/api/v1/applications/{id}"),
            Some(json!({ "date_of_birth": "2004-09-02T00:00:00Z" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile"]["date_of_birth"], "2004-09-02");

    let (status, body) = send(
        &router,
        request(
            Method::PUT,
            &format!("/api/v1/applications/{id}"),
            Some(json!({ "date_of_birth": "2nd of September" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .is_some_and(|message| message.contains("date_of_birth")));
}

#[tokio::test]
async fn non_numeric_id_gets_json_error() {
    let router = build_router();

    for (method, uri) in [
        (Method::GET, "/api/v1/applications/latest"),
        (Method::POST, "/api/v1/applications/latest/submit"),
        (Method::POST, "/api/v1/applications/latest/withdraw"),
        (Method::GET, "/api/v1/applications/latest/status"),
    ] {
        let (status, body) = send(&router, request(method, uri, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].is_string(), "{uri}");
    }

    let (status, body) = send(
        &router,
        request(
            Method::PUT,
            "/api/v1/applications/latest",
            Some(json!({ "full_name": "Asha" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}
