//! API routes (stateless firewall, HTTP Basic or JSON login).

use actix_web::{get, HttpResponse, Responder};
use serde::Serialize;

use actix_firewall::http::security::AuthenticatedUser;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserList {
    message: &'static str,
    requested_by: String,
    roles: Vec<String>,
}

#[get("/api/users")]
pub async fn api_users(user: AuthenticatedUser) -> impl Responder {
    HttpResponse::Ok().json(UserList {
        message: "User list",
        requested_by: user.get_username().to_string(),
        roles: user.get_roles().to_vec(),
    })
}
