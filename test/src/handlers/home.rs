//! Home routes.

use actix_web::{get, HttpResponse, Responder};

use actix_firewall::http::security::{AuthenticatedUser, CurrentToken};

/// Requires a non-anonymous token (401 otherwise).
#[get("/")]
pub async fn index(user: AuthenticatedUser) -> impl Responder {
    HttpResponse::Ok().body(format!(
        "Welcome, {}!\nRoles: {:?}\nAuthorities: {:?}",
        user.get_username(),
        user.get_roles(),
        user.get_authorities()
    ))
}

/// Works for anonymous visitors too.
#[get("/profile")]
pub async fn profile(token: CurrentToken) -> impl Responder {
    match token.as_ref() {
        Some(t) if token.is_authenticated() => HttpResponse::Ok().body(format!(
            "Profile for: {}\nRoles: {:?}",
            t.get_username(),
            t.get_roles()
        )),
        _ => HttpResponse::Ok().body("Guest profile - please login"),
    }
}
