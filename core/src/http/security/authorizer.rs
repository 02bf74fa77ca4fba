//! Access decisions over voters.
//!
//! An [`AccessDecisionManager`] answers whether a token may access a subject
//! given a list of attributes. [`VoterDecisionManager`] polls [`Voter`]s and
//! combines their votes with a [`DecisionStrategy`].

use std::sync::Arc;

use actix_web::HttpRequest;

use crate::http::security::token::{AuthenticationTrustResolver, Token};
use crate::http::security::user::User;

pub const IS_AUTHENTICATED_FULLY: &str = "IS_AUTHENTICATED_FULLY";
pub const IS_AUTHENTICATED_REMEMBERED: &str = "IS_AUTHENTICATED_REMEMBERED";
pub const IS_AUTHENTICATED_ANONYMOUSLY: &str = "IS_AUTHENTICATED_ANONYMOUSLY";

/// Prefix marking an attribute as a role check.
pub const ROLE_PREFIX: &str = "ROLE_";

/// What an access decision is about.
#[derive(Clone, Copy)]
pub enum Subject<'a> {
    Request(&'a HttpRequest),
    User(&'a User),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Granted,
    Abstain,
    Denied,
}

pub trait Voter: Send + Sync {
    fn vote(&self, token: &Token, subject: Subject<'_>, attributes: &[String]) -> Vote;
}

/// Decides whether `token` may access `subject` under `attributes`.
pub trait AccessDecisionManager: Send + Sync {
    fn decide(&self, token: &Token, attributes: &[String], subject: Subject<'_>) -> bool;
}

/// Votes on `ROLE_*` attributes: granted when the token holds the role
/// (stored without the prefix), denied otherwise.
#[derive(Clone, Copy, Default)]
pub struct RoleVoter;

impl Voter for RoleVoter {
    fn vote(&self, token: &Token, _subject: Subject<'_>, attributes: &[String]) -> Vote {
        let mut result = Vote::Abstain;
        for attribute in attributes {
            let Some(role) = attribute.strip_prefix(ROLE_PREFIX) else {
                continue;
            };
            if token.has_role(role) {
                return Vote::Granted;
            }
            result = Vote::Denied;
        }
        result
    }
}

/// Votes on the `IS_AUTHENTICATED_*` attributes.
#[derive(Clone, Copy, Default)]
pub struct AuthenticatedVoter {
    resolver: AuthenticationTrustResolver,
}

impl Voter for AuthenticatedVoter {
    fn vote(&self, token: &Token, _subject: Subject<'_>, attributes: &[String]) -> Vote {
        let token = Some(token);
        let mut result = Vote::Abstain;
        for attribute in attributes {
            let granted = match attribute.as_str() {
                IS_AUTHENTICATED_FULLY => self.resolver.is_fully_authenticated(token),
                IS_AUTHENTICATED_REMEMBERED => {
                    self.resolver.is_remember_me(token) || self.resolver.is_fully_authenticated(token)
                }
                IS_AUTHENTICATED_ANONYMOUSLY => {
                    self.resolver.is_anonymous(token)
                        || self.resolver.is_remember_me(token)
                        || self.resolver.is_fully_authenticated(token)
                }
                _ => continue,
            };
            if granted {
                return Vote::Granted;
            }
            result = Vote::Denied;
        }
        result
    }
}

/// Votes on any attribute that is neither a role nor an `IS_AUTHENTICATED_*`
/// marker, comparing it with the token's authorities.
#[derive(Clone, Copy, Default)]
pub struct AuthorityVoter;

impl Voter for AuthorityVoter {
    fn vote(&self, token: &Token, _subject: Subject<'_>, attributes: &[String]) -> Vote {
        let mut result = Vote::Abstain;
        for attribute in attributes {
            if attribute.starts_with(ROLE_PREFIX) || attribute.starts_with("IS_AUTHENTICATED_") {
                continue;
            }
            if token.has_authority(attribute) {
                return Vote::Granted;
            }
            result = Vote::Denied;
        }
        result
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecisionStrategy {
    /// Grant as soon as one voter grants.
    #[default]
    Affirmative,
    /// Grant when more voters grant than deny.
    Consensus,
    /// Grant only when no voter denies.
    Unanimous,
}

pub struct VoterDecisionManager {
    voters: Vec<Arc<dyn Voter>>,
    strategy: DecisionStrategy,
    allow_if_all_abstain: bool,
    allow_if_equal_granted_denied: bool,
}

impl VoterDecisionManager {
    pub fn new(voters: Vec<Arc<dyn Voter>>) -> Self {
        VoterDecisionManager {
            voters,
            strategy: DecisionStrategy::Affirmative,
            allow_if_all_abstain: false,
            allow_if_equal_granted_denied: true,
        }
    }

    pub fn strategy(mut self, strategy: DecisionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn allow_if_all_abstain(mut self, allow: bool) -> Self {
        self.allow_if_all_abstain = allow;
        self
    }

    pub fn allow_if_equal_granted_denied(mut self, allow: bool) -> Self {
        self.allow_if_equal_granted_denied = allow;
        self
    }

    fn decide_affirmative(&self, token: &Token, attributes: &[String], subject: Subject<'_>) -> bool {
        let mut deny = 0;
        for voter in &self.voters {
            match voter.vote(token, subject, attributes) {
                Vote::Granted => return true,
                Vote::Denied => deny += 1,
                Vote::Abstain => {}
            }
        }
        if deny > 0 {
            return false;
        }
        self.allow_if_all_abstain
    }

    fn decide_consensus(&self, token: &Token, attributes: &[String], subject: Subject<'_>) -> bool {
        let (mut grant, mut deny) = (0, 0);
        for voter in &self.voters {
            match voter.vote(token, subject, attributes) {
                Vote::Granted => grant += 1,
                Vote::Denied => deny += 1,
                Vote::Abstain => {}
            }
        }
        if grant > deny {
            return true;
        }
        if deny > grant {
            return false;
        }
        if grant > 0 {
            return self.allow_if_equal_granted_denied;
        }
        self.allow_if_all_abstain
    }

    /// Every attribute is voted on separately; a single denial denies.
    fn decide_unanimous(&self, token: &Token, attributes: &[String], subject: Subject<'_>) -> bool {
        let mut grant = 0;
        for attribute in attributes {
            let single = std::slice::from_ref(attribute);
            for voter in &self.voters {
                match voter.vote(token, subject, single) {
                    Vote::Granted => grant += 1,
                    Vote::Denied => return false,
                    Vote::Abstain => {}
                }
            }
        }
        if grant > 0 {
            return true;
        }
        self.allow_if_all_abstain
    }
}

impl Default for VoterDecisionManager {
    /// Affirmative decisions over the role, authenticated and authority voters.
    fn default() -> Self {
        VoterDecisionManager::new(vec![
            Arc::new(RoleVoter),
            Arc::new(AuthenticatedVoter::default()),
            Arc::new(AuthorityVoter),
        ])
    }
}

impl AccessDecisionManager for VoterDecisionManager {
    fn decide(&self, token: &Token, attributes: &[String], subject: Subject<'_>) -> bool {
        match self.strategy {
            DecisionStrategy::Affirmative => self.decide_affirmative(token, attributes, subject),
            DecisionStrategy::Consensus => self.decide_consensus(token, attributes, subject),
            DecisionStrategy::Unanimous => self.decide_unanimous(token, attributes, subject),
        }
    }
}
