//! Security events raised by the firewall.
//!
//! Listeners announce logins, user switches, logouts and failures through an
//! [`EventDispatcher`]; applications subscribe with a
//! [`SecurityEventHandler`] or a closure.
//!
//! # Example
//!
//! ```
//! use actix_firewall_core::http::security::events::{EventDispatcher, SecurityEvent};
//!
//! let dispatcher = EventDispatcher::new().with_handler(|event: &SecurityEvent| {
//!     log::info!("[AUDIT] {}", event);
//! });
//! dispatcher.dispatch(SecurityEvent::Logout { username: "admin".into(), firewall: "main".into() });
//! ```

use std::fmt;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityEvent {
    /// A user logged in through a form, JSON body, header or certificate.
    InteractiveLogin { username: String, firewall: String },
    /// A credential check failed.
    AuthenticationFailure {
        username: Option<String>,
        firewall: String,
        reason: String,
    },
    /// `impersonator` now acts as `target`.
    SwitchUser {
        impersonator: String,
        target: String,
        firewall: String,
    },
    /// Impersonation ended, `username` is back.
    ExitUser { username: String, firewall: String },
    Logout { username: String, firewall: String },
    AccessDenied {
        username: Option<String>,
        path: String,
        firewall: String,
    },
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityEvent::InteractiveLogin { username, firewall } => {
                write!(f, "login user={} firewall={}", username, firewall)
            }
            SecurityEvent::AuthenticationFailure {
                username,
                firewall,
                reason,
            } => write!(
                f,
                "authentication_failure user={} firewall={} reason=\"{}\"",
                username.as_deref().unwrap_or("-"),
                firewall,
                reason
            ),
            SecurityEvent::SwitchUser {
                impersonator,
                target,
                firewall,
            } => write!(
                f,
                "switch_user user={} target={} firewall={}",
                impersonator, target, firewall
            ),
            SecurityEvent::ExitUser { username, firewall } => {
                write!(f, "exit_user user={} firewall={}", username, firewall)
            }
            SecurityEvent::Logout { username, firewall } => {
                write!(f, "logout user={} firewall={}", username, firewall)
            }
            SecurityEvent::AccessDenied {
                username,
                path,
                firewall,
            } => write!(
                f,
                "access_denied user={} path={} firewall={}",
                username.as_deref().unwrap_or("-"),
                path,
                firewall
            ),
        }
    }
}

pub trait SecurityEventHandler: Send + Sync {
    fn handle(&self, event: &SecurityEvent);
}

impl<F> SecurityEventHandler for F
where
    F: Fn(&SecurityEvent) + Send + Sync,
{
    fn handle(&self, event: &SecurityEvent) {
        self(event)
    }
}

/// Keeps dispatched events in memory, for tests and debugging.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    events: Arc<Mutex<Vec<SecurityEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl SecurityEventHandler for InMemoryEventStore {
    fn handle(&self, event: &SecurityEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[derive(Clone, Default)]
pub struct EventDispatcher {
    handlers: Arc<Vec<Arc<dyn SecurityEventHandler>>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_handler(mut self, handler: Arc<dyn SecurityEventHandler>) -> Self {
        Arc::make_mut(&mut self.handlers).push(handler);
        self
    }

    pub fn with_handler<F>(self, handler: F) -> Self
    where
        F: Fn(&SecurityEvent) + Send + Sync + 'static,
    {
        self.add_handler(Arc::new(handler))
    }

    pub fn dispatch(&self, event: SecurityEvent) {
        log::debug!("Security event: {}", event);
        for handler in self.handlers.iter() {
            handler.handle(&event);
        }
    }
}
