use derive_more::{Display, Error};

/// Invalid firewall configuration, reported when the firewall is built.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[display("invalid pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },
    #[display("invalid IP address or CIDR range `{value}`")]
    InvalidIp { value: String },
    #[display("firewall `{firewall}` has no listener configured")]
    NoListener { firewall: String },
    #[display("firewall `{firewall}` needs a user provider but none is registered")]
    MissingProvider { firewall: String },
    #[display("firewall `{firewall}` has {count} user providers, choose one with `provider()`")]
    AmbiguousProvider { firewall: String, count: usize },
    #[display("firewall `{firewall}` references unknown user provider `{provider}`")]
    UnknownProvider { firewall: String, provider: String },
}
