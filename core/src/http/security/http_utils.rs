//! Request and redirect helpers shared by the listeners.
//!
//! Paths configured on listeners (`check_path`, `login_path`, ...) are either
//! absolute paths (`/login`), absolute URLs (`https://...`) or route names
//! (`login`), resolved through the application's resource map.

use std::net::IpAddr;

use actix_web::http::{header, StatusCode, Uri};
use actix_web::{HttpMessage, HttpRequest, HttpResponse};
use regex::Regex;

use crate::http::security::event::ServerParams;

/// Whether the request targets `path`.
///
/// A value not starting with `/` is a route name and matches when the request
/// resolves to that route. Otherwise it is compared with the URL-decoded
/// request path.
pub fn check_request_path(req: &HttpRequest, path: &str) -> bool {
    if !path.starts_with('/') {
        if req.match_name() == Some(path) {
            return true;
        }
        if req.url_for_static(path).is_ok() {
            return false;
        }
    }
    decoded_path(req) == path
}

/// Resolves `path` into something usable in a `Location` header.
pub fn generate_uri(req: &HttpRequest, path: &str) -> String {
    if path.starts_with("http") || path.starts_with('/') || path.is_empty() {
        return path.to_string();
    }
    match req.url_for_static(path) {
        Ok(url) => url.to_string(),
        Err(_) => {
            log::debug!("No route named \"{}\", using it as a relative path", path);
            path.to_string()
        }
    }
}

/// Redirect to `path` (a path, URL or route name).
pub fn create_redirect_response(req: &HttpRequest, path: &str, status: StatusCode) -> HttpResponse {
    HttpResponse::build(status)
        .insert_header((header::LOCATION, generate_uri(req, path)))
        .finish()
}

/// Whether `target`, taken from the request, may be used as a redirect.
///
/// Local paths and route names are accepted. Absolute and protocol-relative
/// URLs must point at the request host, or at a host matching
/// `allowed_domains`.
pub fn is_safe_redirect(req: &HttpRequest, target: &str, allowed_domains: Option<&Regex>) -> bool {
    if target.starts_with('\\') || target.starts_with("/\\") {
        return false;
    }
    let rest = if let Some(rest) = target.strip_prefix("//") {
        rest
    } else if target.starts_with('/') {
        return true;
    } else if let Some((scheme, rest)) = target
        .split_once("://")
        .filter(|(scheme, _)| scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c)))
    {
        if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
            return false;
        }
        rest
    } else {
        // `javascript:...` and friends
        return !target.contains(':');
    };

    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    let host = split_host_port(host_port).0;
    if host.is_empty() {
        return false;
    }
    host.eq_ignore_ascii_case(&request_host(req)) || allowed_domains.is_some_and(|re| re.is_match(host))
}

/// Path component of a path or URL.
pub fn path_of(value: &str) -> String {
    value
        .parse::<Uri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|_| value.to_string())
}

/// The URL-decoded request path. Falls back to the raw path when it is not
/// valid percent-encoded UTF-8.
pub fn decoded_path(req: &HttpRequest) -> String {
    let path = req.path();
    urlencoding::decode(path)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// Path and query string, as sent by the client.
pub fn request_uri(req: &HttpRequest) -> String {
    req.uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string())
}

pub fn request_scheme(req: &HttpRequest) -> String {
    req.connection_info().scheme().to_ascii_lowercase()
}

pub fn is_secure(req: &HttpRequest) -> bool {
    request_scheme(req) == "https"
}

/// Host name without port. IPv6 literals keep their brackets.
pub fn request_host(req: &HttpRequest) -> String {
    let info = req.connection_info();
    split_host_port(info.host()).0.to_string()
}

/// Port from the `Host` header, else the scheme's default port.
pub fn request_port(req: &HttpRequest) -> u16 {
    let info = req.connection_info();
    match split_host_port(info.host()).1 {
        Some(port) => port,
        None if info.scheme().eq_ignore_ascii_case("https") => 443,
        None => 80,
    }
}

fn split_host_port(host: &str) -> (&str, Option<u16>) {
    if let Some(end) = host.rfind(']') {
        let port = host[end + 1..].strip_prefix(':').and_then(|p| p.parse().ok());
        return (&host[..=end], port);
    }
    match host.rsplit_once(':') {
        Some((name, port)) => (name, port.parse().ok()),
        None => (host, None),
    }
}

/// Client address: `REMOTE_ADDR` from [`ServerParams`] when present, else
/// the peer address of the connection.
pub fn client_ip(req: &HttpRequest) -> Option<IpAddr> {
    let from_params = req
        .extensions()
        .get::<ServerParams>()
        .and_then(|params| params.get("REMOTE_ADDR").and_then(|a| a.parse().ok()));
    from_params.or_else(|| req.peer_addr().map(|addr| addr.ip()))
}

pub fn is_xml_http_request(req: &HttpRequest) -> bool {
    req.headers()
        .get("X-Requested-With")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == "XMLHttpRequest")
        .unwrap_or(false)
}

pub fn is_method_safe(req: &HttpRequest) -> bool {
    matches!(req.method().as_str(), "GET" | "HEAD" | "OPTIONS" | "TRACE")
}
