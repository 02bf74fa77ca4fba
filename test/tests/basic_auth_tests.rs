//! HTTP Basic Authentication tests on the stateless `api` firewall.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use actix_web::http::{header, StatusCode};
use actix_web::test;

use actix_firewall::http::security::firewall::HttpBasicConfig;
use actix_firewall::http::security::{FirewallContext, FirewallMap};

use common::{basic_auth, create_app, create_test_app, path, CountingProvider};

#[actix_web::test]
async fn test_basic_auth_success() {
    let app = create_test_app().await;

    let req = test::TestRequest::get()
        .uri("/api/users")
        .insert_header(("Authorization", basic_auth("user", "user")))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = test::read_body(resp).await;
    assert_eq!(String::from_utf8_lossy(&body), "API User: user");
}

#[actix_web::test]
async fn test_basic_auth_wrong_password_challenges() {
    let app = create_test_app().await;

    let req = test::TestRequest::get()
        .uri("/api/users")
        .insert_header(("Authorization", basic_auth("user", "wrongpassword")))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        resp.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Basic realm=\"API\""
    );
}

#[actix_web::test]
async fn test_basic_auth_unknown_user() {
    let app = create_test_app().await;

    let req = test::TestRequest::get()
        .uri("/api/users")
        .insert_header(("Authorization", basic_auth("unknown", "password")))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_no_credentials_starts_authentication() {
    let app = create_test_app().await;

    let req = test::TestRequest::get().uri("/api/users").to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
}

#[actix_web::test]
async fn test_authenticated_without_role_is_forbidden() {
    let app = create_test_app().await;

    let req = test::TestRequest::get()
        .uri("/api/users")
        .insert_header(("Authorization", basic_auth("guest", "guest")))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(!resp.headers().contains_key(header::WWW_AUTHENTICATE));
}

#[actix_web::test]
async fn test_stateless_firewall_sets_no_session_cookie() {
    let app = create_test_app().await;

    let req = test::TestRequest::get()
        .uri("/api/users")
        .insert_header(("Authorization", basic_auth("admin", "admin")))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(common::set_cookie(&resp, "id").is_none());
}

#[actix_web::test]
async fn test_overlong_username_never_reaches_provider() {
    let (provider, calls) = CountingProvider::new();
    let map = FirewallMap::builder()
        .user_provider("counting", Arc::new(provider))
        .firewall(
            FirewallContext::builder("api")
                .request_matcher(path("^/api"))
                .stateless(true)
                .http_basic(HttpBasicConfig::new()),
        )
        .build()
        .unwrap();
    let app = create_app(map).await;

    let username = "a".repeat(5000);
    let req = test::TestRequest::get()
        .uri("/api/users")
        .insert_header(("Authorization", basic_auth(&username, "password")))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let req = test::TestRequest::get()
        .uri("/api/users")
        .insert_header(("Authorization", basic_auth("user", "user")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[actix_web::test]
async fn test_requests_outside_every_firewall_bypass_security() {
    let map = FirewallMap::builder()
        .user_provider("memory", Arc::new(common::test_users()))
        .firewall(common::api_firewall())
        .build()
        .unwrap();
    let app = create_app(map).await;

    let req = test::TestRequest::get().uri("/profile").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert_eq!(String::from_utf8_lossy(&body), "Profile: nobody");
}
