//! TLS policy resolution for the `--ssl` flag.
//!
//! The flag accepts the driver's own mode names plus a few shorthands:
//! - `reject` / `no-reject` toggle certificate verification explicitly
//! - `disabled` (or boolean false) turns TLS off
//! - `heroku` enables TLS without certificate verification when every
//!   database host is a `.com` host, and disables it otherwise
//!
//! Every other value is carried through as a raw mode token.

use crate::config::{Environment, FlagValue};
use serde::Serialize;

/// Environment variable holding the comma-separated host list.
pub const HOST_ENV_VAR: &str = "PGHOST";

/// Resolved certificate-validation behavior for the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TlsPolicy {
    /// Bare `--ssl`: TLS with full certificate verification
    Enable,
    /// Try TLS, fall back to plaintext
    Prefer,
    /// TLS required, certificate not verified
    Require,
    /// TLS with unauthorized certificates rejected
    RejectUnauthorized,
    /// TLS with unauthorized certificates accepted
    AllowUnauthorized,
    /// No TLS
    Disabled,
    /// Any other mode token, passed through unchanged
    Other(String),
}

impl TlsPolicy {
    /// Maps a plain mode token to a policy without applying the shorthands.
    pub fn from_token(token: &str) -> Self {
        match token {
            "true" => Self::Enable,
            "prefer" => Self::Prefer,
            "require" => Self::Require,
            other => Self::Other(other.to_string()),
        }
    }

    /// The token this policy was written as on the command line.
    pub fn as_token(&self) -> &str {
        match self {
            Self::Enable => "true",
            Self::Prefer => "prefer",
            Self::Require => "require",
            Self::RejectUnauthorized => "reject",
            Self::AllowUnauthorized => "no-reject",
            Self::Disabled => "disabled",
            Self::Other(token) => token,
        }
    }

    /// The libpq `sslmode` name this policy maps to.
    ///
    /// `AllowUnauthorized` encrypts without checking the certificate, which
    /// is what `require` means to libpq. Raw tokens are returned unchanged.
    pub fn libpq_mode(&self) -> &str {
        match self {
            Self::Enable | Self::RejectUnauthorized => "verify-full",
            Self::Prefer => "prefer",
            Self::Require | Self::AllowUnauthorized => "require",
            Self::Disabled => "disable",
            Self::Other(token) => token,
        }
    }
}

impl std::fmt::Display for TlsPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_token())
    }
}

/// Resolves the `--ssl` flag into a policy.
///
/// Returns `None` when the flag was not given (or given empty), leaving the
/// driver's default in place.
pub fn resolve_tls_policy(
    flag: Option<&FlagValue>,
    connection_target: Option<&str>,
    env: &Environment,
) -> Option<TlsPolicy> {
    let token = match flag? {
        FlagValue::Bool(true) => return Some(TlsPolicy::Enable),
        FlagValue::Bool(false) => return Some(TlsPolicy::Disabled),
        value => value.as_str()?,
    };

    match token {
        "" => None,
        "heroku" => Some(heroku_policy(connection_target, env)),
        "no-reject" => Some(TlsPolicy::AllowUnauthorized),
        "reject" => Some(TlsPolicy::RejectUnauthorized),
        "disabled" | "false" => Some(TlsPolicy::Disabled),
        other => Some(TlsPolicy::from_token(other)),
    }
}

/// Applies the `heroku` heuristic.
///
/// Hosts come from `PGHOST` when set, else from the connection string. An
/// empty host list disables TLS rather than matching vacuously.
pub fn heroku_policy(connection_target: Option<&str>, env: &Environment) -> TlsPolicy {
    let hosts = match env.get(HOST_ENV_VAR) {
        Some(list) => split_hosts(list),
        None => connection_target.map(hosts_from_target).unwrap_or_default(),
    };

    if hosts.is_empty() {
        tracing::warn!("--ssl=heroku could not determine any database host; TLS disabled");
        return TlsPolicy::Disabled;
    }

    if hosts.iter().all(|host| host.ends_with(".com")) {
        TlsPolicy::AllowUnauthorized
    } else {
        tracing::debug!("--ssl=heroku found non .com hosts; TLS disabled");
        TlsPolicy::Disabled
    }
}

/// Extracts the host list from a connection URL's authority section.
///
/// The authority runs from the scheme separator to the next `/` or `?`;
/// credentials before its last `@` and ports are dropped. Strings without a
/// scheme (keyword/value form) yield no hosts.
pub fn hosts_from_target(target: &str) -> Vec<String> {
    let Some((_, rest)) = target.split_once("://") else {
        return Vec::new();
    };

    let authority = rest.split(['/', '?']).next().unwrap_or_default();
    let authority = authority
        .rsplit_once('@')
        .map_or(authority, |(_, hosts)| hosts);

    split_hosts(authority)
        .into_iter()
        .map(|host| host.split(':').next().unwrap_or_default().to_string())
        .filter(|host| !host.is_empty())
        .collect()
}

fn split_hosts(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(str::to_string)
        .collect()
}
