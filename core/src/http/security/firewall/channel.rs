//! Redirects requests made over the wrong scheme.

use std::sync::Arc;

use actix_web::http::{header, StatusCode};
use actix_web::HttpResponse;

use crate::http::error::FirewallError;
use crate::http::security::access_map::{AccessMap, Channel};
use crate::http::security::event::RequestEvent;
use crate::http::security::firewall::{FirewallListener, ListenerKind, Supports};
use crate::http::security::http_utils;

/// Port mapping for HTTP/HTTPS redirects
#[derive(Debug, Clone)]
pub struct PortMapper {
    http_port: u16,
    https_port: u16,
}

impl Default for PortMapper {
    fn default() -> Self {
        Self {
            http_port: 80,
            https_port: 443,
        }
    }
}

impl PortMapper {
    pub fn new(http_port: u16, https_port: u16) -> Self {
        Self {
            http_port,
            https_port,
        }
    }

    pub fn get_https_port(&self) -> u16 {
        self.https_port
    }

    pub fn get_http_port(&self) -> u16 {
        self.http_port
    }

    fn port_for(&self, channel: Channel) -> u16 {
        match channel {
            Channel::Http => self.http_port,
            Channel::Https => self.https_port,
        }
    }
}

/// Enforces the channel required by the [`AccessMap`].
///
/// A request on the wrong scheme gets a 301 to the same host, path and query
/// on the required scheme.
pub struct ChannelListener {
    access_map: Arc<AccessMap>,
    port_mapper: PortMapper,
    redirect_status: StatusCode,
}

impl ChannelListener {
    pub fn new(access_map: Arc<AccessMap>) -> Self {
        ChannelListener {
            access_map,
            port_mapper: PortMapper::default(),
            redirect_status: StatusCode::MOVED_PERMANENTLY,
        }
    }

    pub fn port_mapper(mut self, port_mapper: PortMapper) -> Self {
        self.port_mapper = port_mapper;
        self
    }

    /// Set the HTTP redirect status code (default: 301 Moved Permanently)
    pub fn redirect_status(mut self, status: StatusCode) -> Self {
        self.redirect_status = status;
        self
    }

    fn required_channel(&self, event: &RequestEvent) -> Option<Channel> {
        self.access_map.get_patterns(event.request()).1
    }

    /// `scheme://host[:port]/path?query` on `channel`.
    pub fn build_redirect_url(&self, event: &RequestEvent, channel: Channel) -> String {
        let req = event.request();
        let host = http_utils::request_host(req);
        let port = self.port_mapper.port_for(channel);
        let default_port = match channel {
            Channel::Http => 80,
            Channel::Https => 443,
        };
        let uri = http_utils::request_uri(req);
        if port == default_port {
            format!("{}://{}{}", channel.scheme(), host, uri)
        } else {
            format!("{}://{}:{}{}", channel.scheme(), host, port, uri)
        }
    }
}

impl FirewallListener for ChannelListener {
    fn kind(&self) -> ListenerKind {
        ListenerKind::Channel
    }

    fn supports(&self, event: &mut RequestEvent) -> Supports {
        let secure = http_utils::is_secure(event.request());
        match self.required_channel(event) {
            Some(Channel::Https) if !secure => Supports::Yes,
            Some(Channel::Http) if secure => Supports::Yes,
            _ => Supports::No,
        }
    }

    fn authenticate(&self, event: &mut RequestEvent) -> Result<(), FirewallError> {
        let Some(channel) = self.required_channel(event) else {
            return Ok(());
        };
        let url = self.build_redirect_url(event, channel);
        log::info!("Redirecting to {} channel: {}", channel, url);
        event.set_response(
            HttpResponse::build(self.redirect_status)
                .insert_header((header::LOCATION, url))
                .finish(),
        );
        Ok(())
    }
}
