//! Access control, channel enforcement, JSON login and pre-authentication.

mod common;

use actix_web::http::{header, StatusCode};
use actix_web::test;
use serde_json::json;

use actix_firewall::http::security::firewall::JsonLoginConfig;
use actix_firewall::http::security::{AccessMap, FirewallContext, ServerParams};

use common::{
    basic_auth, create_app, create_app_with_server_params, create_test_app, firewall_map, location, login_request,
    path, Jar,
};

async fn body_of<B: actix_web::body::MessageBody>(resp: actix_web::dev::ServiceResponse<B>) -> String {
    String::from_utf8_lossy(&test::read_body(resp).await).to_string()
}

// =============================================================================
// Channel
// =============================================================================

#[actix_web::test]
async fn test_https_only_path_redirects_plain_http() {
    let app = create_test_app().await;

    let req = test::TestRequest::get()
        .uri("/secure?x=1")
        .insert_header((header::HOST, "example.com"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(location(&resp), "https://example.com/secure?x=1");
}

#[actix_web::test]
async fn test_https_only_path_served_over_https() {
    let app = create_test_app().await;

    let req = test::TestRequest::get()
        .uri("/secure")
        .insert_header((header::HOST, "example.com"))
        .insert_header(("X-Forwarded-Proto", "https"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_of(resp).await, "Secure page");
}

// =============================================================================
// Access denied raised by the application
// =============================================================================

#[actix_web::test]
async fn test_anonymous_denied_by_handler_is_sent_to_login() {
    let app = create_test_app().await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/deny").to_request()).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/login");
}

#[actix_web::test]
async fn test_user_denied_by_handler_gets_forbidden() {
    let app = create_test_app().await;
    let mut jar = Jar::new();

    let resp = test::call_service(&app, login_request("user", "user").to_request()).await;
    jar.update(&resp);

    let req = jar.apply(test::TestRequest::get().uri("/deny")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_forward_to_access_denied_page() {
    let app = create_test_app().await;
    let mut jar = Jar::new();

    let resp = test::call_service(&app, login_request("user", "user").to_request()).await;
    jar.update(&resp);

    let req = jar.apply(test::TestRequest::get().uri("/admin/dashboard")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_of(resp).await, "Access denied page");
}

// =============================================================================
// JSON login
// =============================================================================

#[actix_web::test]
async fn test_json_login_success() {
    let app = create_test_app().await;

    let req = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({ "username": "user", "password": "user" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(location(&resp), "/");
}

#[actix_web::test]
async fn test_json_login_bad_credentials() {
    let app = create_test_app().await;

    let req = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({ "username": "user", "password": "wrong" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body.get("error").is_some());
}

#[actix_web::test]
async fn test_json_login_overlong_username() {
    let app = create_test_app().await;

    let req = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({ "username": "u".repeat(5000), "password": "user" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_json_login_nested_paths() {
    let firewall = FirewallContext::builder("api")
        .request_matcher(path("^/api"))
        .stateless(true)
        .json_login(
            JsonLoginConfig::new()
                .check_path("/api/login")
                .username_path("credentials.login")
                .password_path("credentials.secret")
                .default_target_path("/api/users"),
        );
    let app = create_app(firewall_map(vec![firewall])).await;

    let req = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({ "credentials": { "login": "admin", "secret": "admin" } }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(location(&resp), "/api/users");
}

#[actix_web::test]
async fn test_json_login_accepts_basic_header() {
    let app = create_test_app().await;

    let req = test::TestRequest::post()
        .uri("/api/login")
        .insert_header((header::AUTHORIZATION, basic_auth("admin", "admin")))
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
}

// =============================================================================
// Pre-authentication
// =============================================================================

fn remote_user_map() -> actix_firewall::http::security::FirewallMap {
    firewall_map(vec![FirewallContext::builder("proxy")
        .stateless(true)
        .remote_user()
        .access_map(AccessMap::new().add(path("^/"), &["IS_AUTHENTICATED_FULLY"], None))])
}

#[actix_web::test]
async fn test_remote_user_is_trusted() {
    let app = create_app_with_server_params(remote_user_map(), ServerParams::new().with("REMOTE_USER", "user")).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/whoami").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_of(resp).await, "user");
}

#[actix_web::test]
async fn test_remote_user_unknown_is_rejected() {
    let app = create_app_with_server_params(remote_user_map(), ServerParams::new().with("REMOTE_USER", "nobody")).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/whoami").to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_missing_remote_user_is_unauthorized() {
    let app = create_app_with_server_params(remote_user_map(), ServerParams::new()).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
