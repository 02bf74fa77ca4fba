//! Admin routes (guarded by the access map).

use actix_web::{get, HttpResponse, Responder};

use actix_firewall::http::security::{AuthenticatedUser, CurrentToken};

/// Requires ROLE_ADMIN.
#[get("/admin/dashboard")]
pub async fn admin_dashboard(user: AuthenticatedUser) -> impl Responder {
    HttpResponse::Ok().body(format!(
        "Admin Dashboard\n\nWelcome, {}!\nYou have admin access.",
        user.get_username()
    ))
}

/// Shows who is behind an impersonated session.
#[get("/admin/whoami")]
pub async fn whoami(token: CurrentToken) -> impl Responder {
    let Some(token) = token.into_inner() else {
        return HttpResponse::Ok().body("nobody");
    };
    match token.original_token() {
        Some(original) => HttpResponse::Ok().body(format!(
            "{} (impersonated by {})",
            token.get_username(),
            original.get_username()
        )),
        None => HttpResponse::Ok().body(token.get_username().to_string()),
    }
}

/// Requires ROLE_USER.
#[get("/user/settings")]
pub async fn user_settings(user: AuthenticatedUser) -> impl Responder {
    HttpResponse::Ok().body(format!(
        "User Settings\n\nUser: {}\nRoles: {:?}",
        user.get_username(),
        user.get_roles()
    ))
}
