//! Per-request state threaded through the firewall listeners.
//!
//! A [`RequestEvent`] owns everything a listener may read or change for one
//! request: the request itself, its buffered body, the token storage, the
//! response (once a listener produced one) and cookies to attach to the
//! final response. It is created by the middleware and never shared.

use std::collections::HashMap;

use actix_session::{Session, SessionExt};
use actix_web::cookie::Cookie;
use actix_web::http::header::HeaderName;
use actix_web::{HttpMessage, HttpRequest, HttpResponse};
use serde_json::Value;

use crate::http::security::token::{Token, TokenStorage};

/// Server variables provided by the layer in front of the application,
/// e.g. `SSL_CLIENT_S_DN` from a TLS terminator or `REMOTE_USER`.
///
/// Insert it into the request extensions before the firewall runs.
#[derive(Clone, Debug, Default)]
pub struct ServerParams(HashMap<String, String>);

impl ServerParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.0.insert(name.to_string(), value.to_string());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

/// Request attributes set by earlier layers (router, custom middleware).
#[derive(Clone, Debug, Default)]
pub struct RequestAttributes(HashMap<String, String>);

impl RequestAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.0.insert(name.to_string(), value.to_string());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

/// Parsed request body. Only form and JSON payloads are kept.
#[derive(Clone, Debug, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Form(HashMap<String, String>),
    Json(Value),
}

impl RequestBody {
    /// Parses `bytes` according to the request content type. Unparseable
    /// payloads yield [`RequestBody::Empty`].
    pub fn parse(content_type: &str, bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return RequestBody::Empty;
        }
        if content_type == "application/x-www-form-urlencoded" {
            return match serde_urlencoded::from_bytes::<Vec<(String, String)>>(bytes) {
                Ok(pairs) => RequestBody::Form(pairs.into_iter().collect()),
                Err(e) => {
                    log::debug!("Ignoring malformed form body: {}", e);
                    RequestBody::Empty
                }
            };
        }
        if content_type == "application/json" || content_type.ends_with("+json") {
            return match serde_json::from_slice(bytes) {
                Ok(value) => RequestBody::Json(value),
                Err(e) => {
                    log::debug!("Ignoring malformed JSON body: {}", e);
                    RequestBody::Empty
                }
            };
        }
        RequestBody::Empty
    }

    /// Whether a body with this content type is worth buffering.
    pub fn is_parsed_content_type(content_type: &str) -> bool {
        content_type == "application/x-www-form-urlencoded"
            || content_type == "application/json"
            || content_type.ends_with("+json")
    }

    /// A form field, or a top-level string member of a JSON object.
    pub fn get(&self, name: &str) -> Option<&str> {
        match self {
            RequestBody::Form(fields) => fields.get(name).map(String::as_str),
            RequestBody::Json(value) => value.get(name).and_then(Value::as_str),
            RequestBody::Empty => None,
        }
    }

    pub fn json(&self) -> Option<&Value> {
        match self {
            RequestBody::Json(value) => Some(value),
            _ => None,
        }
    }
}

pub struct RequestEvent {
    request: HttpRequest,
    body: RequestBody,
    query: HashMap<String, String>,
    attributes: HashMap<String, String>,
    token_storage: TokenStorage,
    response: Option<HttpResponse>,
    cookies: Vec<Cookie<'static>>,
    access_attributes: Option<Vec<String>>,
}

impl RequestEvent {
    pub fn new(request: HttpRequest, body: RequestBody) -> Self {
        let query = serde_urlencoded::from_str::<Vec<(String, String)>>(request.query_string())
            .map(|pairs| pairs.into_iter().collect())
            .unwrap_or_default();
        RequestEvent {
            request,
            body,
            query,
            attributes: HashMap::new(),
            token_storage: TokenStorage::default(),
            response: None,
            cookies: Vec::new(),
            access_attributes: None,
        }
    }

    /// Starts the event with a token already in storage.
    pub fn with_token(mut self, token: Option<Token>) -> Self {
        self.token_storage.set_token(token);
        self
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Looks a parameter up in the query string, then in the body.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.query(name).or_else(|| self.body.get(name))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let name = HeaderName::try_from(name).ok()?;
        self.request.headers().get(name)?.to_str().ok()
    }

    /// A server variable from [`ServerParams`] in the request extensions.
    pub fn server(&self, name: &str) -> Option<String> {
        self.request
            .extensions()
            .get::<ServerParams>()
            .and_then(|params| params.get(name).map(str::to_string))
    }

    pub fn cookie(&self, name: &str) -> Option<Cookie<'static>> {
        self.request.cookie(name)
    }

    /// Attribute set during this request, falling back to the
    /// [`RequestAttributes`] provided by earlier layers.
    pub fn attribute(&self, name: &str) -> Option<String> {
        if let Some(value) = self.attributes.get(name) {
            return Some(value.clone());
        }
        self.request
            .extensions()
            .get::<RequestAttributes>()
            .and_then(|attrs| attrs.get(name).map(str::to_string))
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) {
        self.attributes.insert(name.to_string(), value.to_string());
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        self.attributes.remove(name)
    }

    pub fn session(&self) -> Session {
        self.request.get_session()
    }

    /// Whether the client already holds a session: the session cookie came
    /// with the request or the session was written to earlier on.
    pub fn has_session(&self, cookie_name: &str) -> bool {
        self.request.cookie(cookie_name).is_some() || !self.session().entries().is_empty()
    }

    pub fn token(&self) -> Option<&Token> {
        self.token_storage.get_token()
    }

    pub fn set_token(&mut self, token: Option<Token>) {
        self.token_storage.set_token(token);
    }

    pub fn take_token(&mut self) -> Option<Token> {
        self.token_storage.take_token()
    }

    pub fn token_storage(&self) -> &TokenStorage {
        &self.token_storage
    }

    pub fn has_response(&self) -> bool {
        self.response.is_some()
    }

    pub fn response(&self) -> Option<&HttpResponse> {
        self.response.as_ref()
    }

    pub fn set_response(&mut self, response: HttpResponse) {
        self.response = Some(response);
    }

    pub fn take_response(&mut self) -> Option<HttpResponse> {
        self.response.take()
    }

    pub fn add_cookie(&mut self, cookie: Cookie<'static>) {
        self.cookies.push(cookie);
    }

    /// Queues a cookie that tells the client to drop `name`.
    pub fn remove_cookie(&mut self, name: &str, path: &str, domain: Option<&str>) {
        let mut cookie = Cookie::build(name.to_string(), "")
            .path(path.to_string())
            .finish();
        if let Some(domain) = domain {
            cookie.set_domain(domain.to_string());
        }
        cookie.make_removal();
        self.cookies.push(cookie);
    }

    pub fn cookies(&self) -> &[Cookie<'static>] {
        &self.cookies
    }

    pub fn access_attributes(&self) -> Option<&[String]> {
        self.access_attributes.as_deref()
    }

    pub fn set_access_attributes(&mut self, attributes: Option<Vec<String>>) {
        self.access_attributes = attributes;
    }

    pub(crate) fn into_parts(self) -> (Option<Token>, Option<HttpResponse>, Vec<Cookie<'static>>) {
        let RequestEvent {
            mut token_storage,
            response,
            cookies,
            ..
        } = self;
        (token_storage.take_token(), response, cookies)
    }
}
