//! Impersonation through `?_switch_user=` on the `main` firewall.

mod common;

use actix_web::http::StatusCode;
use actix_web::test;

use common::{create_test_app, location, login_request, Jar};

async fn body_of<B: actix_web::body::MessageBody>(resp: actix_web::dev::ServiceResponse<B>) -> String {
    String::from_utf8_lossy(&test::read_body(resp).await).to_string()
}

#[actix_web::test]
async fn test_switch_and_exit() {
    let app = create_test_app().await;
    let mut jar = Jar::new();

    let resp = test::call_service(&app, login_request("admin", "admin").to_request()).await;
    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
    jar.update(&resp);

    let req = jar
        .apply(test::TestRequest::get().uri("/whoami?_switch_user=user&page=2"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/whoami?page=2");
    jar.update(&resp);

    let req = jar.apply(test::TestRequest::get().uri("/whoami")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_of(resp).await, "user (impersonated by admin)");

    // The impersonated user lacks ROLE_ADMIN.
    let req = jar.apply(test::TestRequest::get().uri("/admin/dashboard")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = jar
        .apply(test::TestRequest::get().uri("/whoami?_switch_user=_exit"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/whoami");
    jar.update(&resp);

    let req = jar.apply(test::TestRequest::get().uri("/whoami")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(body_of(resp).await, "admin");
}

#[actix_web::test]
async fn test_switch_without_role_is_denied() {
    let app = create_test_app().await;
    let mut jar = Jar::new();

    let resp = test::call_service(&app, login_request("user", "user").to_request()).await;
    jar.update(&resp);

    let req = jar
        .apply(test::TestRequest::get().uri("/whoami?_switch_user=admin"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_of(resp).await, "Access denied page");
}

#[actix_web::test]
async fn test_switch_to_unknown_user_is_denied() {
    let app = create_test_app().await;
    let mut jar = Jar::new();

    let resp = test::call_service(&app, login_request("admin", "admin").to_request()).await;
    jar.update(&resp);

    let req = jar
        .apply(test::TestRequest::get().uri("/whoami?_switch_user=nobody"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_exit_without_impersonation_requires_login() {
    let app = create_test_app().await;
    let mut jar = Jar::new();

    let resp = test::call_service(&app, login_request("admin", "admin").to_request()).await;
    jar.update(&resp);

    let req = jar
        .apply(test::TestRequest::get().uri("/whoami?_switch_user=_exit"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/login");
}
