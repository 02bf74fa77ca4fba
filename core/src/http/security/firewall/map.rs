use std::sync::Arc;

use actix_web::HttpRequest;

use crate::http::error::ConfigError;
use crate::http::security::firewall::context::{FirewallBuilder, FirewallConfig, FirewallContext};
use crate::http::security::user_provider::UserProvider;

/// Firewalls in registration order. The first one whose matcher accepts the
/// request handles it; requests no firewall matches are not secured.
pub struct FirewallMap {
    firewalls: Vec<FirewallContext>,
}

impl FirewallMap {
    pub fn builder() -> FirewallMapBuilder {
        FirewallMapBuilder::default()
    }

    pub fn get_listeners(&self, req: &HttpRequest) -> Option<&FirewallContext> {
        self.firewalls.iter().find(|firewall| firewall.get_matcher().matches(req))
    }

    pub fn get_firewall_config(&self, req: &HttpRequest) -> Option<&FirewallConfig> {
        self.get_listeners(req).map(FirewallContext::get_config)
    }

    pub fn firewalls(&self) -> &[FirewallContext] {
        &self.firewalls
    }
}

#[derive(Default)]
pub struct FirewallMapBuilder {
    providers: Vec<(String, Arc<dyn UserProvider>)>,
    firewalls: Vec<FirewallBuilder>,
}

impl FirewallMapBuilder {
    /// Registers a named user provider visible to every firewall.
    pub fn user_provider(mut self, name: &str, provider: Arc<dyn UserProvider>) -> Self {
        self.providers.push((name.to_string(), provider));
        self
    }

    pub fn firewall(mut self, firewall: FirewallBuilder) -> Self {
        self.firewalls.push(firewall);
        self
    }

    pub fn build(self) -> Result<FirewallMap, ConfigError> {
        let providers = self.providers;
        let firewalls = self
            .firewalls
            .into_iter()
            .map(|firewall| firewall.build(&providers))
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("Firewall map built with {} firewall(s)", firewalls.len());
        Ok(FirewallMap { firewalls })
    }
}
