//! The firewall as an Actix Web middleware.
//!
//! For every request the [`Firewall`] picks the first matching firewall of
//! its [`FirewallMap`], runs its listeners and then either answers directly
//! or calls the application with the resulting [`Token`] in the request
//! extensions.

use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use actix_service::{Service, Transform};
use actix_web::body::EitherBody;
use actix_web::cookie::Cookie;
use actix_web::dev::{Payload, ServiceRequest, ServiceResponse};
use actix_web::error::PayloadError;
use actix_web::http::{StatusCode, Uri};
use actix_web::web::Bytes;
use actix_web::{Error, HttpMessage, HttpResponse};
use futures_util::future::{ok, LocalBoxFuture, Ready};
use futures_util::stream::{self, Stream};

use crate::http::security::event::{RequestBody, RequestEvent};
use crate::http::security::firewall::{FirewallContext, FirewallMap, FirewallOutcome};
use crate::http::security::token::Token;

/// Firewall middleware factory.
///
/// # Example
/// ```ignore
/// let map = FirewallMap::builder()
///     .user_provider("memory", users)
///     .firewall(FirewallContext::builder("main").http_basic(HttpBasicConfig::new()))
///     .build()?;
///
/// App::new()
///     .wrap(Firewall::new(map))
///     .wrap(SessionMiddleware::new(store, key))
/// ```
#[derive(Clone)]
pub struct Firewall {
    map: Arc<FirewallMap>,
}

impl Firewall {
    pub fn new(map: FirewallMap) -> Self {
        Firewall { map: Arc::new(map) }
    }

    pub fn from_arc(map: Arc<FirewallMap>) -> Self {
        Firewall { map }
    }

    pub fn get_map(&self) -> &FirewallMap {
        &self.map
    }
}

impl<S, B> Transform<S, ServiceRequest> for Firewall
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = FirewallService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(FirewallService {
            map: Arc::clone(&self.map),
            service: Rc::new(service),
        })
    }
}

/// Firewall middleware service.
pub struct FirewallService<S> {
    map: Arc<FirewallMap>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for FirewallService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    actix_web::dev::forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let map = Arc::clone(&self.map);

        Box::pin(async move {
            let Some(firewall) = map.get_listeners(req.request()) else {
                let res = service.call(req).await?;
                return Ok(res.map_into_left_body());
            };
            log::debug!(
                "Firewall \"{}\" handles {} {}",
                firewall.get_config().get_name(),
                req.method(),
                req.path()
            );

            let body = buffer_body(&mut req).await?;
            let event = RequestEvent::new(req.request().clone(), body);
            let result = firewall.handle(event);
            let mut token = result.token;
            let cookies = result.cookies;

            match result.outcome {
                FirewallOutcome::Proceed => {}
                FirewallOutcome::Respond(response) => {
                    firewall.on_response(req.request(), token.as_ref());
                    let mut res = req.into_response(response);
                    apply_cookies(res.response_mut(), &cookies);
                    return Ok(res.map_into_right_body());
                }
                FirewallOutcome::Fail(error) => {
                    firewall.on_response(req.request(), token.as_ref());
                    let mut res = req.error_response(error);
                    apply_cookies(res.response_mut(), &cookies);
                    return Ok(res.map_into_right_body());
                }
                FirewallOutcome::Forward(path) => {
                    let uri = match path.parse::<Uri>() {
                        Ok(uri) => uri,
                        Err(e) => {
                            log::warn!("Cannot forward to \"{}\": {}", path, e);
                            let mut res = req.into_response(forbidden());
                            apply_cookies(res.response_mut(), &cookies);
                            return Ok(res.map_into_right_body());
                        }
                    };
                    log::debug!("Forwarding to \"{}\"", uri);
                    req.match_info_mut().get_mut().update(&uri);
                    req.head_mut().uri = uri;
                    if let Some(token) = &token {
                        req.extensions_mut().insert(token.clone());
                    }
                    let mut res = service.call(req).await?;
                    *res.response_mut().status_mut() = StatusCode::FORBIDDEN;
                    firewall.on_response(res.request(), token.as_ref());
                    apply_cookies(res.response_mut(), &cookies);
                    return Ok(res.map_into_left_body());
                }
            }

            if let Some(token) = &token {
                req.extensions_mut().insert(token.clone());
            }
            let mut res = service.call(req).await?;

            // Handlers may replace the token, e.g. after a programmatic login.
            if let Some(current) = res.request().extensions().get::<Token>().cloned() {
                token = Some(current);
            }

            if let Some(translated) = translate_error(firewall, &res, token.clone()) {
                let (http_req, _) = res.into_parts();
                firewall.on_response(&http_req, translated.token.as_ref());
                let response = match translated.outcome {
                    FirewallOutcome::Respond(response) => response,
                    FirewallOutcome::Fail(error) => Error::from(error).error_response(),
                    FirewallOutcome::Forward(path) => {
                        log::debug!("Cannot forward to \"{}\" once the application answered", path);
                        forbidden()
                    }
                    FirewallOutcome::Proceed => forbidden(),
                };
                let mut res = ServiceResponse::new(http_req, response);
                apply_cookies(res.response_mut(), &cookies);
                apply_cookies(res.response_mut(), &translated.cookies);
                return Ok(res.map_into_right_body());
            }

            firewall.on_response(res.request(), token.as_ref());
            apply_cookies(res.response_mut(), &cookies);
            Ok(res.map_into_left_body())
        })
    }
}

fn translate_error<B>(
    firewall: &FirewallContext,
    res: &ServiceResponse<B>,
    token: Option<Token>,
) -> Option<crate::http::security::firewall::FirewallResult> {
    let error = res.response().error()?;
    firewall.handle_downstream_error(res.request().clone(), token, error)
}

/// Reads form and JSON bodies so listeners can see them, then puts the bytes
/// back for the application.
async fn buffer_body(req: &mut ServiceRequest) -> Result<RequestBody, Error> {
    let content_type = req.content_type().to_string();
    if !RequestBody::is_parsed_content_type(&content_type) {
        return Ok(RequestBody::Empty);
    }
    let bytes = req.extract::<Bytes>().await?;
    let body = RequestBody::parse(&content_type, &bytes);
    req.set_payload(payload_from_bytes(bytes));
    Ok(body)
}

fn payload_from_bytes(bytes: Bytes) -> Payload {
    let stream: Pin<Box<dyn Stream<Item = Result<Bytes, PayloadError>>>> =
        Box::pin(stream::once(async move { Ok::<_, PayloadError>(bytes) }));
    Payload::from(stream)
}

fn apply_cookies<B>(response: &mut actix_web::HttpResponse<B>, cookies: &[Cookie<'static>]) {
    for cookie in cookies {
        if let Err(e) = response.add_cookie(cookie) {
            log::warn!("Cannot set cookie \"{}\": {}", cookie.name(), e);
        }
    }
}

fn forbidden() -> HttpResponse {
    HttpResponse::build(StatusCode::FORBIDDEN).finish()
}
