//! A firewall: its configuration, its listeners and how a request goes
//! through them.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use actix_firewall_core::http::security::firewall::{FirewallContext, FormLoginConfig};
//! use actix_firewall_core::http::security::{AccessMap, InMemoryUserProvider, RequestMatcher, User, UserProvider};
//!
//! let users: Arc<dyn UserProvider> = Arc::new(
//!     InMemoryUserProvider::new().with_user(User::new("admin".into(), "{noop}admin".into())),
//! );
//! let access_map = AccessMap::new().add(
//!     RequestMatcher::builder().path("^/admin").build().unwrap(),
//!     &["ROLE_ADMIN"],
//!     None,
//! );
//! let firewall = FirewallContext::builder("main")
//!     .form_login(FormLoginConfig::new())
//!     .anonymous()
//!     .access_map(access_map)
//!     .build(&[("memory".to_string(), users)])
//!     .unwrap();
//! assert_eq!(firewall.get_config().get_name(), "main");
//! ```

use std::error::Error as StdError;
use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::{HttpRequest, HttpResponse};

use crate::http::error::{
    AccessDeniedError, AuthenticationError, ConfigError, FirewallError, LazyResponseError, LogoutError,
};
use crate::http::security::access_map::AccessMap;
use crate::http::security::authorizer::{AccessDecisionManager, VoterDecisionManager};
use crate::http::security::crypto::PasswordEncoder;
use crate::http::security::csrf::CsrfTokenManager;
use crate::http::security::event::{RequestBody, RequestEvent};
use crate::http::security::events::EventDispatcher;
use crate::http::security::firewall::access::AccessListener;
use crate::http::security::firewall::anonymous::AnonymousAuthenticationListener;
use crate::http::security::firewall::basic::{BasicAuthenticationListener, HttpBasicConfig};
use crate::http::security::firewall::channel::{ChannelListener, PortMapper};
use crate::http::security::firewall::context_listener::ContextListener;
use crate::http::security::firewall::exception::{ExceptionConfig, ExceptionListener, ExceptionOutcome};
use crate::http::security::firewall::form_login::{FormLoginConfig, UsernamePasswordFormAuthenticationListener};
use crate::http::security::firewall::json_login::{JsonLoginConfig, UsernamePasswordJsonAuthenticationListener};
use crate::http::security::firewall::logout::{
    CookieClearingLogoutHandler, CsrfTokenClearingLogoutHandler, LogoutConfig, LogoutHandler,
    LogoutListener, SessionLogoutHandler,
};
use crate::http::security::firewall::pre_auth::{PreAuthenticatedListener, PreAuthenticatedSource};
use crate::http::security::firewall::remember_me::RememberMeListener;
use crate::http::security::firewall::switch_user::{SwitchUserConfig, SwitchUserListener};
use crate::http::security::firewall::{FirewallListener, ListenerKind, LoginService, Supports};
use crate::http::security::handlers::{AccessDeniedHandler, AuthenticationEntryPoint};
use crate::http::security::manager::{
    AnonymousAuthenticationProvider, AuthenticationManager, AuthenticationProvider,
    DaoAuthenticationProvider, PreAuthenticatedAuthenticationProvider, ProviderManager,
    RememberMeAuthenticationProvider,
};
use crate::http::security::remember_me::{RememberMeConfig, RememberMeServices, TokenBasedRememberMeServices};
use crate::http::security::request_matcher::RequestMatcher;
use crate::http::security::session::SessionConfig;
use crate::http::security::token::Token;
use crate::http::security::user_provider::{DefaultUserChecker, UserChecker, UserProvider};

// =============================================================================
// Firewall Configuration
// =============================================================================

/// Read-only description of a built firewall.
#[derive(Debug, Clone)]
pub struct FirewallConfig {
    name: String,
    stateless: bool,
    context: String,
    provider: Option<String>,
    entry_point: Option<ListenerKind>,
    access_denied_url: Option<String>,
    listeners: Vec<ListenerKind>,
}

impl FirewallConfig {
    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn is_stateless(&self) -> bool {
        self.stateless
    }

    /// Session context shared by firewalls that want to share logins.
    pub fn get_context(&self) -> &str {
        &self.context
    }

    pub fn get_provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Listener whose entry point starts authentication.
    pub fn get_entry_point(&self) -> Option<ListenerKind> {
        self.entry_point
    }

    pub fn get_access_denied_url(&self) -> Option<&str> {
        self.access_denied_url.as_deref()
    }

    /// Listener kinds in execution order.
    pub fn get_listeners(&self) -> &[ListenerKind] {
        &self.listeners
    }
}

// =============================================================================
// Firewall Context
// =============================================================================

/// What the pipeline decided for a request.
#[derive(Debug)]
pub enum FirewallOutcome {
    /// Hand the request to the application.
    Proceed,
    Respond(HttpResponse),
    /// Render this path internally, answering 403.
    Forward(String),
    Fail(FirewallError),
}

/// Outcome plus the state the middleware applies afterwards.
#[derive(Debug)]
pub struct FirewallResult {
    pub outcome: FirewallOutcome,
    pub token: Option<Token>,
    pub cookies: Vec<Cookie<'static>>,
}

impl FirewallResult {
    fn from_event(outcome: FirewallOutcome, event: RequestEvent) -> Self {
        let (token, _, cookies) = event.into_parts();
        FirewallResult {
            outcome,
            token,
            cookies,
        }
    }
}

pub struct FirewallContext {
    config: FirewallConfig,
    matcher: RequestMatcher,
    listeners: Vec<Arc<dyn FirewallListener>>,
    exception_listener: ExceptionListener,
    logout_listener: Option<Arc<LogoutListener>>,
    context_listener: Option<Arc<ContextListener>>,
}

impl FirewallContext {
    pub fn builder(name: &str) -> FirewallBuilder {
        FirewallBuilder::new(name)
    }

    pub fn get_config(&self) -> &FirewallConfig {
        &self.config
    }

    pub fn get_matcher(&self) -> &RequestMatcher {
        &self.matcher
    }

    pub fn get_listeners(&self) -> &[Arc<dyn FirewallListener>] {
        &self.listeners
    }

    pub fn get_exception_listener(&self) -> &ExceptionListener {
        &self.exception_listener
    }

    pub fn get_logout_listener(&self) -> Option<&LogoutListener> {
        self.logout_listener.as_deref()
    }

    /// Runs the listeners in order. The first response ends the chain; the
    /// first error goes to the exception listener.
    pub fn handle(&self, mut event: RequestEvent) -> FirewallResult {
        for listener in &self.listeners {
            if listener.supports(&mut event) == Supports::No {
                continue;
            }
            if let Err(error) = listener.authenticate(&mut event) {
                log::debug!("Listener {:?} failed: {}", listener.kind(), error);
                let outcome = self.translate(&mut event, error);
                return FirewallResult::from_event(outcome, event);
            }
            if let Some(response) = event.take_response() {
                log::debug!("Listener {:?} answered the request", listener.kind());
                return FirewallResult::from_event(FirewallOutcome::Respond(response), event);
            }
        }
        FirewallResult::from_event(FirewallOutcome::Proceed, event)
    }

    fn translate(&self, event: &mut RequestEvent, error: FirewallError) -> FirewallOutcome {
        match self.exception_listener.handle(event, &error) {
            ExceptionOutcome::Respond(response) => FirewallOutcome::Respond(response),
            ExceptionOutcome::Forward(path) => FirewallOutcome::Forward(path),
            ExceptionOutcome::Propagate(error) => FirewallOutcome::Fail(error),
            ExceptionOutcome::Unhandled => FirewallOutcome::Fail(error),
        }
    }

    /// Translates an error returned by the application the way listener
    /// errors are translated. `None` when the error is not security related.
    pub fn handle_downstream_error(
        &self,
        req: HttpRequest,
        token: Option<Token>,
        error: &actix_web::Error,
    ) -> Option<FirewallResult> {
        let inner: &(dyn StdError + 'static) = if let Some(e) = error.as_error::<AuthenticationError>() {
            e
        } else if let Some(e) = error.as_error::<AccessDeniedError>() {
            e
        } else if let Some(e) = error.as_error::<LazyResponseError>() {
            e
        } else if let Some(e) = error.as_error::<LogoutError>() {
            e
        } else {
            return None;
        };

        let mut event = RequestEvent::new(req, RequestBody::Empty).with_token(token);
        let outcome = match self.exception_listener.handle(&mut event, inner) {
            ExceptionOutcome::Respond(response) => FirewallOutcome::Respond(response),
            ExceptionOutcome::Forward(path) => FirewallOutcome::Forward(path),
            ExceptionOutcome::Propagate(error) => FirewallOutcome::Fail(error),
            ExceptionOutcome::Unhandled => return None,
        };
        Some(FirewallResult::from_event(outcome, event))
    }

    /// Stores the final token in the session of stateful firewalls.
    pub fn on_response(&self, req: &HttpRequest, token: Option<&Token>) {
        if let Some(listener) = &self.context_listener {
            use actix_session::SessionExt;
            listener.save(&req.get_session(), token);
        }
    }
}

// =============================================================================
// Firewall Builder
// =============================================================================

/// Assembles a [`FirewallContext`].
///
/// Listeners always run in the same order whatever the order of the builder
/// calls. `build` checks the configuration and fails with a [`ConfigError`].
pub struct FirewallBuilder {
    name: String,
    matcher: RequestMatcher,
    stateless: bool,
    context: Option<String>,
    provider: Option<String>,
    secret: String,
    access_map: AccessMap,
    port_mapper: PortMapper,
    pre_auth: Vec<PreAuthenticatedSource>,
    form_login: Option<FormLoginConfig>,
    json_login: Option<JsonLoginConfig>,
    http_basic: Option<HttpBasicConfig>,
    remember_me: Option<RememberMeConfig>,
    anonymous: bool,
    custom_listeners: Vec<Arc<dyn FirewallListener>>,
    switch_user: Option<SwitchUserConfig>,
    logout: Option<LogoutConfig>,
    logout_handlers: Vec<Arc<dyn LogoutHandler>>,
    exception: ExceptionConfig,
    entry_point: Option<Arc<dyn AuthenticationEntryPoint>>,
    access_denied_handler: Option<Arc<dyn AccessDeniedHandler>>,
    session: SessionConfig,
    csrf_token_manager: Option<Arc<dyn CsrfTokenManager>>,
    password_encoder: Option<Arc<dyn PasswordEncoder>>,
    user_checker: Arc<dyn UserChecker>,
    access_decision_manager: Arc<dyn AccessDecisionManager>,
    extra_providers: Vec<Arc<dyn AuthenticationProvider>>,
    erase_credentials: bool,
    dispatcher: EventDispatcher,
}

impl FirewallBuilder {
    pub fn new(name: &str) -> Self {
        FirewallBuilder {
            name: name.to_string(),
            matcher: RequestMatcher::any(),
            stateless: false,
            context: None,
            provider: None,
            secret: name.to_string(),
            access_map: AccessMap::new(),
            port_mapper: PortMapper::default(),
            pre_auth: Vec::new(),
            form_login: None,
            json_login: None,
            http_basic: None,
            remember_me: None,
            anonymous: false,
            custom_listeners: Vec::new(),
            switch_user: None,
            logout: None,
            logout_handlers: Vec::new(),
            exception: ExceptionConfig::new(),
            entry_point: None,
            access_denied_handler: None,
            session: SessionConfig::default(),
            csrf_token_manager: None,
            password_encoder: None,
            user_checker: Arc::new(DefaultUserChecker),
            access_decision_manager: Arc::new(VoterDecisionManager::default()),
            extra_providers: Vec::new(),
            erase_credentials: true,
            dispatcher: EventDispatcher::default(),
        }
    }

    /// Requests this firewall applies to (default: all).
    pub fn request_matcher(mut self, matcher: RequestMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn stateless(mut self, stateless: bool) -> Self {
        self.stateless = stateless;
        self
    }

    /// Firewalls with the same context share the stored token.
    pub fn context(mut self, context: &str) -> Self {
        self.context = Some(context.to_string());
        self
    }

    /// Name of the user provider to use when several are registered.
    pub fn provider(mut self, name: &str) -> Self {
        self.provider = Some(name.to_string());
        self
    }

    /// Secret shared by anonymous tokens and their provider.
    pub fn secret(mut self, secret: &str) -> Self {
        self.secret = secret.to_string();
        self
    }

    pub fn access_map(mut self, access_map: AccessMap) -> Self {
        self.access_map = access_map;
        self
    }

    pub fn port_mapper(mut self, port_mapper: PortMapper) -> Self {
        self.port_mapper = port_mapper;
        self
    }

    pub fn x509(mut self) -> Self {
        self.pre_auth.push(PreAuthenticatedSource::x509());
        self
    }

    pub fn remote_user(mut self) -> Self {
        self.pre_auth.push(PreAuthenticatedSource::remote_user());
        self
    }

    pub fn pre_authenticated(mut self, source: PreAuthenticatedSource) -> Self {
        self.pre_auth.push(source);
        self
    }

    pub fn form_login(mut self, config: FormLoginConfig) -> Self {
        self.form_login = Some(config);
        self
    }

    pub fn json_login(mut self, config: JsonLoginConfig) -> Self {
        self.json_login = Some(config);
        self
    }

    pub fn http_basic(mut self, config: HttpBasicConfig) -> Self {
        self.http_basic = Some(config);
        self
    }

    pub fn remember_me(mut self, config: RememberMeConfig) -> Self {
        self.remember_me = Some(config);
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    /// Runs after the built-in authentication listeners.
    pub fn listener(mut self, listener: Arc<dyn FirewallListener>) -> Self {
        self.custom_listeners.push(listener);
        self
    }

    pub fn switch_user(mut self, config: SwitchUserConfig) -> Self {
        self.switch_user = Some(config);
        self
    }

    pub fn logout(mut self, config: LogoutConfig) -> Self {
        self.logout = Some(config);
        self
    }

    /// Runs on logout, after the built-in handlers.
    pub fn logout_handler(mut self, handler: Arc<dyn LogoutHandler>) -> Self {
        self.logout_handlers.push(handler);
        self
    }

    pub fn access_denied_url(mut self, url: &str) -> Self {
        self.exception = self.exception.access_denied_url(url);
        self
    }

    pub fn access_denied_handler(mut self, handler: Arc<dyn AccessDeniedHandler>) -> Self {
        self.access_denied_handler = Some(handler);
        self
    }

    /// Replaces the entry point picked from the configured listeners.
    pub fn entry_point(mut self, entry_point: Arc<dyn AuthenticationEntryPoint>) -> Self {
        self.entry_point = Some(entry_point);
        self
    }

    pub fn session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn csrf_token_manager(mut self, manager: Arc<dyn CsrfTokenManager>) -> Self {
        self.csrf_token_manager = Some(manager);
        self
    }

    pub fn password_encoder(mut self, encoder: Arc<dyn PasswordEncoder>) -> Self {
        self.password_encoder = Some(encoder);
        self
    }

    pub fn user_checker(mut self, checker: Arc<dyn UserChecker>) -> Self {
        self.user_checker = checker;
        self
    }

    pub fn access_decision_manager(mut self, manager: Arc<dyn AccessDecisionManager>) -> Self {
        self.access_decision_manager = manager;
        self
    }

    /// Extra provider for tokens produced by custom listeners.
    pub fn authentication_provider(mut self, provider: Arc<dyn AuthenticationProvider>) -> Self {
        self.extra_providers.push(provider);
        self
    }

    pub fn erase_credentials(mut self, erase: bool) -> Self {
        self.erase_credentials = erase;
        self
    }

    pub fn dispatcher(mut self, dispatcher: EventDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    fn has_authentication_listener(&self) -> bool {
        !self.pre_auth.is_empty()
            || self.form_login.is_some()
            || self.json_login.is_some()
            || self.http_basic.is_some()
            || self.remember_me.is_some()
            || self.anonymous
            || !self.custom_listeners.is_empty()
    }

    fn needs_user_provider(&self) -> bool {
        !self.pre_auth.is_empty()
            || self.form_login.is_some()
            || self.json_login.is_some()
            || self.http_basic.is_some()
            || self.remember_me.is_some()
            || self.switch_user.is_some()
            || !self.stateless
    }

    fn resolve_provider(
        &self,
        providers: &[(String, Arc<dyn UserProvider>)],
    ) -> Result<(String, Arc<dyn UserProvider>), ConfigError> {
        if let Some(name) = &self.provider {
            return providers
                .iter()
                .find(|(n, _)| n == name)
                .map(|(n, p)| (n.clone(), Arc::clone(p)))
                .ok_or_else(|| ConfigError::UnknownProvider {
                    firewall: self.name.clone(),
                    provider: name.clone(),
                });
        }
        match providers {
            [] => Err(ConfigError::MissingProvider {
                firewall: self.name.clone(),
            }),
            [(name, provider)] => Ok((name.clone(), Arc::clone(provider))),
            _ => Err(ConfigError::AmbiguousProvider {
                firewall: self.name.clone(),
                count: providers.len(),
            }),
        }
    }

    fn default_password_encoder() -> Arc<dyn PasswordEncoder> {
        #[cfg(feature = "argon2")]
        {
            Arc::new(crate::http::security::crypto::DelegatingPasswordEncoder::new())
        }
        #[cfg(not(feature = "argon2"))]
        {
            Arc::new(crate::http::security::crypto::NoOpPasswordEncoder)
        }
    }

    /// Checks the configuration and wires the listeners.
    pub fn build(self, providers: &[(String, Arc<dyn UserProvider>)]) -> Result<FirewallContext, ConfigError> {
        if !self.has_authentication_listener() {
            return Err(ConfigError::NoListener {
                firewall: self.name.clone(),
            });
        }

        let user_provider = if self.needs_user_provider() {
            Some(self.resolve_provider(providers)?)
        } else {
            None
        };
        let provider_name = user_provider.as_ref().map(|(name, _)| name.clone());
        let user_provider = user_provider.map(|(_, provider)| provider);

        let name = self.name.clone();
        let context = self.context.clone().unwrap_or_else(|| name.clone());
        let password_encoder = self
            .password_encoder
            .clone()
            .unwrap_or_else(Self::default_password_encoder);

        // Authentication manager for this firewall
        let mut manager = ProviderManager::new().erase_credentials(self.erase_credentials);
        if let Some(users) = &user_provider {
            if self.form_login.is_some() || self.json_login.is_some() || self.http_basic.is_some() {
                manager = manager.provider(Arc::new(DaoAuthenticationProvider::new(
                    Arc::clone(users),
                    Arc::clone(&self.user_checker),
                    Arc::clone(&password_encoder),
                    &name,
                )));
            }
            if !self.pre_auth.is_empty() {
                manager = manager.provider(Arc::new(PreAuthenticatedAuthenticationProvider::new(
                    Arc::clone(users),
                    Arc::clone(&self.user_checker),
                    &name,
                )));
            }
        }
        if let Some(config) = &self.remember_me {
            manager = manager.provider(Arc::new(RememberMeAuthenticationProvider::new(
                Arc::clone(&self.user_checker),
                config.get_key(),
                &name,
            )));
        }
        if self.anonymous {
            manager = manager.provider(Arc::new(AnonymousAuthenticationProvider::new(&self.secret)));
        }
        for provider in &self.extra_providers {
            manager = manager.provider(Arc::clone(provider));
        }
        let manager: Arc<dyn AuthenticationManager> = Arc::new(manager);

        let remember_me_services: Option<Arc<TokenBasedRememberMeServices>> =
            match (&self.remember_me, &user_provider) {
                (Some(config), Some(users)) => Some(Arc::new(TokenBasedRememberMeServices::new(
                    config.clone(),
                    Arc::clone(users),
                    &name,
                ))),
                _ => None,
            };
        let remember_me_dyn = remember_me_services
            .clone()
            .map(|s| s as Arc<dyn RememberMeServices>);

        let login = LoginService::new(&name, Arc::clone(&manager))
            .session(self.session.clone())
            .stateless(self.stateless)
            .dispatcher(self.dispatcher.clone());

        let access_map = Arc::new(self.access_map);
        let mut listeners: Vec<Arc<dyn FirewallListener>> = Vec::new();
        let mut kinds = Vec::new();
        let mut push = |listener: Arc<dyn FirewallListener>| {
            kinds.push(listener.kind());
            listeners.push(listener);
        };

        if !access_map.is_empty() {
            push(Arc::new(
                ChannelListener::new(Arc::clone(&access_map)).port_mapper(self.port_mapper.clone()),
            ));
        }

        let mut context_listener = None;
        if !self.stateless {
            if let Some(users) = &user_provider {
                let listener = Arc::new(ContextListener::new(&context, Arc::clone(users), self.session.clone()));
                context_listener = Some(Arc::clone(&listener));
                push(listener);
            }
        }

        for source in self.pre_auth {
            push(Arc::new(PreAuthenticatedListener::new(login.clone(), source)));
        }

        let mut entry_point: Option<(ListenerKind, Arc<dyn AuthenticationEntryPoint>)> = None;

        if let Some(config) = &self.form_login {
            entry_point = Some((ListenerKind::Form, Arc::new(config.entry_point())));
            push(Arc::new(
                UsernamePasswordFormAuthenticationListener::new(
                    login.clone().remember_me(remember_me_dyn.clone()),
                    config.clone(),
                )
                .csrf_token_manager(self.csrf_token_manager.clone()),
            ));
        }

        if let Some(config) = &self.json_login {
            push(Arc::new(UsernamePasswordJsonAuthenticationListener::new(
                login.clone().remember_me(remember_me_dyn.clone()),
                config.clone(),
            )));
        }

        if let Some(config) = &self.http_basic {
            entry_point = Some((ListenerKind::HttpBasic, Arc::new(config.entry_point())));
            push(Arc::new(BasicAuthenticationListener::new(
                login.clone().remember_me(remember_me_dyn.clone()),
                config.clone(),
            )));
        }

        if let (Some(config), Some(services)) = (&self.remember_me, &remember_me_dyn) {
            push(Arc::new(
                RememberMeListener::new(login.clone(), Arc::clone(services))
                    .catch_exceptions(config.is_catch_exceptions()),
            ));
        }

        if self.anonymous {
            push(Arc::new(
                AnonymousAuthenticationListener::new(&self.secret, &name).manager(Arc::clone(&manager)),
            ));
        }

        for listener in self.custom_listeners {
            push(listener);
        }

        if let (Some(config), Some(users)) = (&self.switch_user, &user_provider) {
            push(Arc::new(
                SwitchUserListener::new(
                    &name,
                    config.clone(),
                    Arc::clone(users),
                    Arc::clone(&self.user_checker),
                    Arc::clone(&self.access_decision_manager),
                )
                .dispatcher(self.dispatcher.clone())
                .stateless(self.stateless),
            ));
        }

        let mut logout_listener = None;
        if let Some(config) = self.logout {
            let mut listener = LogoutListener::new(&name, config.clone())
                .csrf_token_manager(self.csrf_token_manager.clone())
                .dispatcher(self.dispatcher.clone());
            if config.is_invalidate_session() && !self.stateless {
                listener = listener.handler(Arc::new(SessionLogoutHandler));
            }
            if let Some(csrf) = &self.csrf_token_manager {
                listener = listener.handler(Arc::new(CsrfTokenClearingLogoutHandler::new(Arc::clone(csrf))));
            }
            if !config.get_delete_cookies().is_empty() {
                listener = listener.handler(Arc::new(CookieClearingLogoutHandler::new(
                    config.get_delete_cookies().to_vec(),
                )));
            }
            if let Some(services) = &remember_me_services {
                listener = listener.handler(Arc::clone(services) as Arc<dyn LogoutHandler>);
            }
            for handler in self.logout_handlers {
                listener = listener.handler(handler);
            }
            let listener = Arc::new(listener);
            logout_listener = Some(Arc::clone(&listener));
            push(listener);
        }

        if !access_map.is_empty() {
            push(Arc::new(AccessListener::new(
                Arc::clone(&access_map),
                Arc::clone(&self.access_decision_manager),
                Arc::clone(&manager),
            )));
        }

        let (entry_point_kind, entry_point) = match (self.entry_point, entry_point) {
            (Some(custom), _) => (Some(ListenerKind::Custom), Some(custom)),
            (None, Some((kind, entry_point))) => (Some(kind), Some(entry_point)),
            (None, None) => (None, None),
        };

        let exception_listener = ExceptionListener::new(
            &name,
            self.exception.clone().stateless(self.stateless),
            self.session.clone(),
        )
        .entry_point(entry_point)
        .access_denied_handler(self.access_denied_handler)
        .dispatcher(self.dispatcher);

        let config = FirewallConfig {
            name: name.clone(),
            stateless: self.stateless,
            context,
            provider: provider_name,
            entry_point: entry_point_kind,
            access_denied_url: self.exception.get_access_denied_url().map(str::to_string),
            listeners: kinds,
        };

        log::debug!("Firewall \"{}\" built with listeners {:?}", name, config.listeners);

        Ok(FirewallContext {
            config,
            matcher: self.matcher,
            listeners,
            exception_listener,
            logout_listener,
            context_listener,
        })
    }
}
