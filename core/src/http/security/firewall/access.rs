//! Enforces the access rules of the [`AccessMap`].

use std::sync::Arc;

use crate::http::error::{AccessDeniedError, AuthenticationError, FirewallError};
use crate::http::security::access_map::AccessMap;
use crate::http::security::authorizer::{AccessDecisionManager, Subject, IS_AUTHENTICATED_ANONYMOUSLY};
use crate::http::security::event::RequestEvent;
use crate::http::security::firewall::{FirewallListener, ListenerKind, Supports};
use crate::http::security::http_utils;
use crate::http::security::manager::AuthenticationManager;

/// Last listener of the chain.
///
/// The request passes when any one of the rule's attributes is granted.
pub struct AccessListener {
    access_map: Arc<AccessMap>,
    access_decision_manager: Arc<dyn AccessDecisionManager>,
    manager: Arc<dyn AuthenticationManager>,
}

impl AccessListener {
    pub fn new(
        access_map: Arc<AccessMap>,
        access_decision_manager: Arc<dyn AccessDecisionManager>,
        manager: Arc<dyn AuthenticationManager>,
    ) -> Self {
        AccessListener {
            access_map,
            access_decision_manager,
            manager,
        }
    }
}

impl FirewallListener for AccessListener {
    fn kind(&self) -> ListenerKind {
        ListenerKind::Access
    }

    fn supports(&self, event: &mut RequestEvent) -> Supports {
        let attributes = self
            .access_map
            .get_patterns(event.request())
            .0
            .map(<[String]>::to_vec);
        let applies = match attributes.as_deref() {
            None | Some([]) => false,
            Some([only]) if only == IS_AUTHENTICATED_ANONYMOUSLY => false,
            Some(_) => true,
        };
        event.set_access_attributes(attributes);
        Supports::from(applies)
    }

    fn authenticate(&self, event: &mut RequestEvent) -> Result<(), FirewallError> {
        let attributes = event.access_attributes().map(<[String]>::to_vec).unwrap_or_default();

        let Some(mut token) = event.token().cloned() else {
            return Err(AuthenticationError::CredentialsNotFound.into());
        };

        if !token.is_authenticated() {
            token = self.manager.authenticate(token)?;
            event.set_token(Some(token.clone()));
        }

        let granted = attributes.iter().any(|attribute| {
            self.access_decision_manager.decide(
                &token,
                std::slice::from_ref(attribute),
                Subject::Request(event.request()),
            )
        });

        if !granted {
            log::debug!(
                "Access denied to \"{}\" for \"{}\", requires {:?}",
                http_utils::decoded_path(event.request()),
                token.get_username(),
                attributes
            );
            return Err(AccessDeniedError::default()
                .attributes(&attributes)
                .subject(&http_utils::request_uri(event.request()))
                .into());
        }
        Ok(())
    }
}
