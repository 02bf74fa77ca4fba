//! Ordered access rules: request matcher to required attributes and channel.

use std::fmt;

use actix_web::HttpRequest;

use crate::http::security::request_matcher::RequestMatcher;

/// Transport a rule requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Http,
    Https,
}

impl Channel {
    pub fn scheme(&self) -> &'static str {
        match self {
            Channel::Http => "http",
            Channel::Https => "https",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

#[derive(Debug, Clone)]
struct AccessRule {
    matcher: RequestMatcher,
    attributes: Vec<String>,
    channel: Option<Channel>,
}

/// First matching rule wins.
///
/// ```
/// use actix_firewall_core::http::security::{AccessMap, Channel, RequestMatcher};
/// use actix_web::test::TestRequest;
///
/// let map = AccessMap::new()
///     .add(
///         RequestMatcher::builder().path("^/admin").build().unwrap(),
///         &["ROLE_ADMIN"],
///         Some(Channel::Https),
///     )
///     .add(RequestMatcher::any(), &["IS_AUTHENTICATED_ANONYMOUSLY"], None);
///
/// let req = TestRequest::get().uri("/admin/users").to_http_request();
/// let (attributes, channel) = map.get_patterns(&req);
/// assert_eq!(attributes.unwrap(), &["ROLE_ADMIN".to_string()]);
/// assert_eq!(channel, Some(Channel::Https));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AccessMap {
    rules: Vec<AccessRule>,
}

impl AccessMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, matcher: RequestMatcher, attributes: &[&str], channel: Option<Channel>) -> Self {
        self.rules.push(AccessRule {
            matcher,
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
            channel,
        });
        self
    }

    /// Attributes and channel of the first rule matching `req`, or
    /// `(None, None)` when no rule matches.
    pub fn get_patterns(&self, req: &HttpRequest) -> (Option<&[String]>, Option<Channel>) {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(req))
            .map(|rule| (Some(rule.attributes.as_slice()), rule.channel))
            .unwrap_or((None, None))
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
