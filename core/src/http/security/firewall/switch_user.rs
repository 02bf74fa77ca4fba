//! Impersonation: `?_switch_user=bob` to become bob, `?_switch_user=_exit`
//! to come back.

use std::sync::Arc;

use actix_web::http::StatusCode;
use rand::Rng;

use crate::http::error::{AccessDeniedError, AuthenticationError, FirewallError};
use crate::http::security::authorizer::{AccessDecisionManager, Subject};
use crate::http::security::event::RequestEvent;
use crate::http::security::events::{EventDispatcher, SecurityEvent};
use crate::http::security::firewall::{check_username, FirewallListener, ListenerKind, Supports};
use crate::http::security::http_utils;
use crate::http::security::token::Token;
use crate::http::security::user::User;
use crate::http::security::user_provider::{UserChecker, UserProvider};

pub const EXIT_VALUE: &str = "_exit";

#[derive(Debug, Clone)]
pub struct SwitchUserConfig {
    parameter: String,
    role: String,
}

impl Default for SwitchUserConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SwitchUserConfig {
    pub fn new() -> Self {
        SwitchUserConfig {
            parameter: "_switch_user".to_string(),
            role: "ROLE_ALLOWED_TO_SWITCH".to_string(),
        }
    }

    /// Query/body parameter, or header, naming the target user.
    pub fn parameter(mut self, name: &str) -> Self {
        self.parameter = name.to_string();
        self
    }

    /// Attribute the current token needs to be granted to switch.
    pub fn role(mut self, role: &str) -> Self {
        self.role = role.to_string();
        self
    }

    pub fn get_parameter(&self) -> &str {
        &self.parameter
    }

    pub fn get_role(&self) -> &str {
        &self.role
    }
}

/// Lets privileged users act as someone else.
///
/// The switched token wraps the original one and carries the extra
/// `PREVIOUS_ADMIN` role. Every failed switch is reported as access denied,
/// whatever the cause, so the parameter cannot be used to discover users.
pub struct SwitchUserListener {
    provider_key: String,
    config: SwitchUserConfig,
    user_provider: Arc<dyn UserProvider>,
    user_checker: Arc<dyn UserChecker>,
    access_decision_manager: Arc<dyn AccessDecisionManager>,
    dispatcher: EventDispatcher,
    stateless: bool,
}

impl SwitchUserListener {
    pub fn new(
        provider_key: &str,
        config: SwitchUserConfig,
        user_provider: Arc<dyn UserProvider>,
        user_checker: Arc<dyn UserChecker>,
        access_decision_manager: Arc<dyn AccessDecisionManager>,
    ) -> Self {
        SwitchUserListener {
            provider_key: provider_key.to_string(),
            config,
            user_provider,
            user_checker,
            access_decision_manager,
            dispatcher: EventDispatcher::default(),
            stateless: false,
        }
    }

    pub fn dispatcher(mut self, dispatcher: EventDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn stateless(mut self, stateless: bool) -> Self {
        self.stateless = stateless;
        self
    }

    fn requested_username(&self, event: &RequestEvent) -> Option<String> {
        event
            .parameter(&self.config.parameter)
            .or_else(|| event.header(&self.config.parameter))
            .filter(|u| !u.is_empty())
            .map(str::to_string)
    }

    /// Builds the token impersonating `username`.
    ///
    /// Returns the current token unchanged when it already impersonates
    /// `username`. A token impersonating somebody else is first switched
    /// back to its original.
    pub fn attempt_switch_user(&self, event: &RequestEvent, username: &str) -> Result<Token, FirewallError> {
        let mut token = event
            .token()
            .cloned()
            .ok_or(AuthenticationError::CredentialsNotFound)?;

        if token.original_token().is_some() {
            if token.get_username() == username {
                return Ok(token);
            }
            token = self.attempt_exit_user(event)?;
        }

        let current_username = token.get_username().to_string();
        let user = check_username(username)
            .and_then(|_| self.load_target(username, &current_username))
            .map_err(|e| {
                AccessDeniedError::new(&format!("Switching to user failed: {}", e))
                    .subject(username)
            })?;

        let attributes = [self.config.role.clone()];
        if !self
            .access_decision_manager
            .decide(&token, &attributes, Subject::User(&user))
        {
            log::info!("User \"{}\" may not switch to \"{}\"", current_username, username);
            return Err(AccessDeniedError::default()
                .attributes(&attributes)
                .subject(username)
                .into());
        }

        log::info!("Attempting to switch to user \"{}\"", username);

        self.user_checker.check_post_auth(&user).map_err(|e| {
            AccessDeniedError::new(&format!("Switching to user failed: {}", e)).subject(username)
        })?;

        let switched = Token::switched(user, &self.provider_key, token);
        self.dispatcher.dispatch(SecurityEvent::SwitchUser {
            impersonator: current_username,
            target: username.to_string(),
            firewall: self.provider_key.clone(),
        });
        Ok(switched)
    }

    /// The token that was active before the switch.
    pub fn attempt_exit_user(&self, event: &RequestEvent) -> Result<Token, FirewallError> {
        let original = event
            .token()
            .and_then(Token::original_token)
            .cloned()
            .ok_or_else(|| {
                log::debug!("Could not find original token");
                AuthenticationError::CredentialsNotFound
            })?;

        self.dispatcher.dispatch(SecurityEvent::ExitUser {
            username: original.get_username().to_string(),
            firewall: self.provider_key.clone(),
        });
        Ok(original)
    }

    /// Loads the target, plus a random user nobody has, so existing and
    /// unknown names cost the same lookups.
    fn load_target(&self, username: &str, current_username: &str) -> Result<User, AuthenticationError> {
        let nonexistent = format!("_{}", hex::encode(rand::thread_rng().gen::<[u8; 16]>()));
        match self.user_provider.load_user_by_username(username) {
            Ok(user) => {
                let _ = self.user_provider.load_user_by_username(&nonexistent);
                Ok(user)
            }
            Err(e) => {
                let _ = self.user_provider.load_user_by_username(current_username);
                Err(e)
            }
        }
    }

    /// The request URI without the switch parameter.
    fn redirect_uri(&self, event: &RequestEvent) -> String {
        let req = event.request();
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(req.query_string()).unwrap_or_default();
        let remaining: Vec<(String, String)> = pairs
            .into_iter()
            .filter(|(name, _)| *name != self.config.parameter)
            .collect();
        let query = serde_urlencoded::to_string(&remaining).unwrap_or_default();
        if query.is_empty() {
            req.path().to_string()
        } else {
            format!("{}?{}", req.path(), query)
        }
    }
}

impl FirewallListener for SwitchUserListener {
    fn kind(&self) -> ListenerKind {
        ListenerKind::SwitchUser
    }

    fn supports(&self, event: &mut RequestEvent) -> Supports {
        Supports::from(self.requested_username(event).is_some())
    }

    fn authenticate(&self, event: &mut RequestEvent) -> Result<(), FirewallError> {
        let Some(username) = self.requested_username(event) else {
            return Ok(());
        };
        if event.token().is_none() {
            return Err(AuthenticationError::CredentialsNotFound.into());
        }

        let token = if username == EXIT_VALUE {
            self.attempt_exit_user(event)?
        } else {
            self.attempt_switch_user(event, &username)?
        };
        event.set_token(Some(token));

        if !self.stateless {
            let uri = self.redirect_uri(event);
            let response = http_utils::create_redirect_response(event.request(), &uri, StatusCode::FOUND);
            event.set_response(response);
        }
        Ok(())
    }
}
