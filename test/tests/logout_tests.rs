//! Logout on the `main` firewall.

mod common;

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::test;

use actix_firewall::http::security::firewall::LogoutConfig;
use actix_firewall::http::security::SessionCsrfTokenManager;

use common::{create_app, create_test_app, firewall_map, location, login_request, set_cookie, Jar};

#[actix_web::test]
async fn test_logout_ends_the_session() {
    let app = create_test_app().await;
    let mut jar = Jar::new();

    let req = test::TestRequest::post()
        .uri("/login_check")
        .set_form([("_username", "admin"), ("_password", "admin"), ("_remember_me", "on")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
    jar.update(&resp);
    assert!(jar.get("REMEMBERME").is_some());

    let req = jar.apply(test::TestRequest::get().uri("/logout")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");
    let removed = set_cookie(&resp, "REMEMBERME").expect("remember-me cookie removal");
    assert!(removed.value().is_empty());
    jar.update(&resp);
    assert!(jar.get("REMEMBERME").is_none());

    let req = jar.apply(test::TestRequest::get().uri("/")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/login");
}

#[actix_web::test]
async fn test_logout_without_login_still_redirects() {
    let app = create_test_app().await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/logout").to_request()).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");
}

#[actix_web::test]
async fn test_logout_with_csrf_protection() {
    let firewall = common::main_firewall()
        .logout(LogoutConfig::new().target("/login").enable_csrf(true))
        .csrf_token_manager(Arc::new(SessionCsrfTokenManager::new()));
    let app = create_app(firewall_map(vec![firewall])).await;
    let mut jar = Jar::new();

    let resp = test::call_service(&app, login_request("user", "user").to_request()).await;
    jar.update(&resp);

    let req = jar.apply(test::TestRequest::get().uri("/logout")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = jar.apply(test::TestRequest::get().uri("/csrf/logout")).to_request();
    let resp = test::call_service(&app, req).await;
    jar.update(&resp);
    let token = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();

    let req = jar
        .apply(test::TestRequest::get().uri(&format!("/logout?_csrf_token={}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/login");
}
