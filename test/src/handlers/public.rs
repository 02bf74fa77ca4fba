//! Public routes (reachable anonymously).

use actix_session::Session;
use actix_web::{get, HttpResponse, Responder};

use actix_firewall::http::security::SessionConfig;

/// Login form posting to the form login check path.
#[get("/login")]
pub async fn login(session: Session) -> impl Responder {
    let config = SessionConfig::default();
    let last_username = escape(&config.get_last_username(&session).unwrap_or_default());
    let error = config
        .get_last_error(&session)
        .map(|e| format!("<p class=\"error\">{}</p>", escape(&e)))
        .unwrap_or_default();

    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(format!(
            r#"<!DOCTYPE html>
<html>
<head><title>Login</title></head>
<body>
{error}
<form method="post" action="/login_check">
  <input type="text" name="_username" value="{last_username}">
  <input type="password" name="_password">
  <label><input type="checkbox" name="_remember_me" value="on"> Remember me</label>
  <button type="submit">Login</button>
</form>
</body>
</html>"#
        ))
}

/// Rendered in place of the denied page, with a 403 status.
#[get("/access-denied")]
pub async fn access_denied() -> impl Responder {
    HttpResponse::Ok().body("Access denied")
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
