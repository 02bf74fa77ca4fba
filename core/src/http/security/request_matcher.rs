//! Request matching on path, host, method, scheme, port, client IP and
//! request attributes.
//!
//! Every criterion is optional; a matcher with no criteria matches every
//! request. Configured criteria are checked in a fixed order and the first
//! failing one rejects the request.
//!
//! # Example
//! ```
//! use actix_firewall_core::http::security::RequestMatcher;
//! use actix_web::test::TestRequest;
//!
//! let matcher = RequestMatcher::builder()
//!     .path("^/admin")
//!     .methods(&["GET", "POST"])
//!     .build()
//!     .unwrap();
//!
//! assert!(matcher.matches(&TestRequest::get().uri("/admin/users").to_http_request()));
//! assert!(!matcher.matches(&TestRequest::delete().uri("/admin/users").to_http_request()));
//! ```

use std::net::IpAddr;

use actix_web::HttpRequest;
use actix_web::HttpMessage;
use ipnet::IpNet;
use regex::{Regex, RegexBuilder};

use crate::http::error::ConfigError;
use crate::http::security::event::RequestAttributes;
use crate::http::security::http_utils;

#[derive(Debug, Clone, Default)]
pub struct RequestMatcher {
    path: Option<Regex>,
    host: Option<Regex>,
    methods: Vec<String>,
    schemes: Vec<String>,
    ips: Vec<IpNet>,
    port: Option<u16>,
    attributes: Vec<(String, Regex)>,
}

impl RequestMatcher {
    pub fn builder() -> RequestMatcherBuilder {
        RequestMatcherBuilder::default()
    }

    /// Matcher without criteria.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn matches(&self, req: &HttpRequest) -> bool {
        if !self.schemes.is_empty() {
            let scheme = http_utils::request_scheme(req);
            if !self.schemes.iter().any(|s| *s == scheme) {
                return false;
            }
        }

        if !self.methods.is_empty() && !self.methods.iter().any(|m| m == req.method().as_str()) {
            return false;
        }

        for (name, pattern) in &self.attributes {
            match request_attribute(req, name) {
                Some(value) if pattern.is_match(&value) => {}
                _ => return false,
            }
        }

        if let Some(path) = &self.path {
            if !path.is_match(&http_utils::decoded_path(req)) {
                return false;
            }
        }

        if let Some(host) = &self.host {
            if !host.is_match(&http_utils::request_host(req)) {
                return false;
            }
        }

        if let Some(port) = self.port.filter(|p| *p > 0) {
            if http_utils::request_port(req) != port {
                return false;
            }
        }

        if self.ips.is_empty() {
            return true;
        }
        match http_utils::client_ip(req) {
            Some(ip) => self.ips.iter().any(|net| net_contains(net, ip)),
            None => false,
        }
    }
}

fn net_contains(net: &IpNet, ip: IpAddr) -> bool {
    match (net, ip) {
        (IpNet::V4(net), IpAddr::V6(v6)) => v6.to_ipv4_mapped().map_or(false, |v4| net.contains(&v4)),
        _ => net.contains(&ip),
    }
}

/// `_route` resolves to the matched route name; other names are read from
/// [`RequestAttributes`].
fn request_attribute(req: &HttpRequest, name: &str) -> Option<String> {
    if name == "_route" {
        if let Some(route) = req.match_name() {
            return Some(route.to_string());
        }
    }
    req.extensions()
        .get::<RequestAttributes>()
        .and_then(|attrs| attrs.get(name).map(str::to_string))
}

#[derive(Debug, Clone, Default)]
pub struct RequestMatcherBuilder {
    path: Option<String>,
    host: Option<String>,
    methods: Vec<String>,
    schemes: Vec<String>,
    ips: Vec<String>,
    port: Option<u16>,
    attributes: Vec<(String, String)>,
}

impl RequestMatcherBuilder {
    /// Regex searched (unanchored) in the URL-decoded path.
    pub fn path(mut self, pattern: &str) -> Self {
        self.path = Some(pattern.to_string());
        self
    }

    /// Regex searched case-insensitively in the host name.
    pub fn host(mut self, pattern: &str) -> Self {
        self.host = Some(pattern.to_string());
        self
    }

    pub fn methods(mut self, methods: &[&str]) -> Self {
        self.methods = methods.iter().map(|m| m.to_ascii_uppercase()).collect();
        self
    }

    pub fn schemes(mut self, schemes: &[&str]) -> Self {
        self.schemes = schemes.iter().map(|s| s.to_ascii_lowercase()).collect();
        self
    }

    /// IP addresses or CIDR ranges. Entries may hold comma-separated lists.
    pub fn ips(mut self, ips: &[&str]) -> Self {
        self.ips = ips
            .iter()
            .flat_map(|entry| entry.split(','))
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_string)
            .collect();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Requires the request attribute `name` to exist and match `pattern`.
    pub fn attribute(mut self, name: &str, pattern: &str) -> Self {
        self.attributes.push((name.to_string(), pattern.to_string()));
        self
    }

    pub fn build(self) -> Result<RequestMatcher, ConfigError> {
        let path = self.path.as_deref().map(compile).transpose()?;
        let host = self
            .host
            .as_deref()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| invalid_pattern(pattern, e))
            })
            .transpose()?;
        let attributes = self
            .attributes
            .iter()
            .map(|(name, pattern)| -> Result<(String, Regex), ConfigError> {
                Ok((name.clone(), compile(pattern)?))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        let ips = self
            .ips
            .iter()
            .map(|ip| parse_ip(ip))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(RequestMatcher {
            path,
            host,
            methods: self.methods,
            schemes: self.schemes,
            ips,
            port: self.port,
            attributes,
        })
    }
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| invalid_pattern(pattern, e))
}

fn invalid_pattern(pattern: &str, error: regex::Error) -> ConfigError {
    ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        message: error.to_string(),
    }
}

/// A bare address is a single-host network (/32 or /128).
fn parse_ip(value: &str) -> Result<IpNet, ConfigError> {
    value
        .parse::<IpNet>()
        .or_else(|_| value.parse::<IpAddr>().map(IpNet::from))
        .map_err(|_| ConfigError::InvalidIp {
            value: value.to_string(),
        })
}
