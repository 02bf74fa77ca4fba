//! Form login, remember-me and session restoration on the stateful `main` firewall.

mod common;

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::test;

use actix_firewall::http::security::firewall::FormLoginConfig;
use actix_firewall::http::security::SessionCsrfTokenManager;

use common::{
    create_app, create_test_app, firewall_map, location, login_request, main_access_map, set_cookie, Jar,
};

#[actix_web::test]
async fn test_login_redirects_back_to_requested_page() {
    let app = create_test_app().await;
    let mut jar = Jar::new();

    let req = test::TestRequest::get().uri("/admin/dashboard").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/login");
    jar.update(&resp);

    let req = jar.apply(login_request("admin", "admin")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(location(&resp), "/admin/dashboard");
    jar.update(&resp);

    let req = jar.apply(test::TestRequest::get().uri("/admin/dashboard")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert_eq!(String::from_utf8_lossy(&body), "Admin: admin");
}

#[actix_web::test]
async fn test_login_without_saved_target_goes_to_default() {
    let app = create_test_app().await;

    let req = login_request("user", "user").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(location(&resp), "/");
}

#[actix_web::test]
async fn test_bad_credentials_redirect_to_login() {
    let app = create_test_app().await;
    let mut jar = Jar::new();

    let req = login_request("admin", "wrong").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/login");
    jar.update(&resp);

    let req = jar.apply(test::TestRequest::get().uri("/")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/login");
}

#[actix_web::test]
async fn test_login_check_only_accepts_post() {
    let app = create_test_app().await;

    let req = test::TestRequest::get()
        .uri("/login_check?_username=admin&_password=admin")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/login");
}

#[actix_web::test]
async fn test_anonymous_pages_stay_reachable() {
    let app = create_test_app().await;

    let req = test::TestRequest::get().uri("/profile").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert_eq!(String::from_utf8_lossy(&body), "Profile: anon.");
}

#[actix_web::test]
async fn test_csrf_protected_login() {
    let firewall = common::main_firewall()
        .form_login(FormLoginConfig::new().enable_csrf(true))
        .csrf_token_manager(Arc::new(SessionCsrfTokenManager::new()))
        .access_map(main_access_map());
    let app = create_app(firewall_map(vec![firewall])).await;
    let mut jar = Jar::new();

    let req = test::TestRequest::get().uri("/csrf/authenticate").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    jar.update(&resp);
    let token = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();

    let req = jar.apply(login_request("user", "user")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/login");

    let req = jar
        .apply(test::TestRequest::post().uri("/login_check").set_form([
            ("_username", "user"),
            ("_password", "user"),
            ("_csrf_token", token.as_str()),
        ]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(location(&resp), "/");
}

#[actix_web::test]
async fn test_remember_me_cookie_restores_login() {
    let app = create_test_app().await;

    let req = test::TestRequest::post()
        .uri("/login_check")
        .set_form([("_username", "admin"), ("_password", "admin"), ("_remember_me", "on")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
    let remember_me = set_cookie(&resp, "REMEMBERME").expect("remember-me cookie");

    // A fresh client holding only the remember-me cookie.
    let req = test::TestRequest::get()
        .uri("/")
        .cookie(remember_me.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert_eq!(String::from_utf8_lossy(&body), "Welcome, admin!");
}

#[actix_web::test]
async fn test_tampered_remember_me_cookie_is_cancelled() {
    let app = create_test_app().await;

    let req = test::TestRequest::get()
        .uri("/")
        .cookie(actix_web::cookie::Cookie::new("REMEMBERME", "YWRtaW4=:99999999999:forged"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/login");
    let cancelled = set_cookie(&resp, "REMEMBERME").expect("cancelled cookie");
    assert!(cancelled.value().is_empty());
}

#[actix_web::test]
async fn test_login_ignores_foreign_target_path() {
    let app = create_test_app().await;

    let req = test::TestRequest::post()
        .uri("/login_check")
        .insert_header((actix_web::http::header::HOST, "app.example"))
        .set_form([
            ("_username", "user"),
            ("_password", "user"),
            ("_target_path", "https://evil.example/phish"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(location(&resp), "/");
}
