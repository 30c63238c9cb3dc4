//! Configuration loading and representation.

use serde::{Deserialize, Serialize};

use miniauth_auth::JwtConfig;

/// Default token lifetime: one day.
pub const DEFAULT_EXPIRATION_MINUTES: i64 = 60 * 24;
/// Longest accepted token lifetime: a leap year.
pub const MAX_EXPIRATION_MINUTES: i64 = 60 * 24 * 366;

/// Gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// First path segment of the admin surface (no slashes).
    pub route_prefix: String,
    /// Lifetime of issued tokens (and of the "remember me" cookie).
    pub expiration_minutes: i64,
    pub jwt: JwtConfig,
    /// Production mode hides internal error detail from 500 bodies.
    pub production: bool,
    /// Postgres connection string; in-memory storage when absent.
    pub database_url: Option<String>,
    pub bind_addr: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            route_prefix: "miniauth".to_string(),
            expiration_minutes: DEFAULT_EXPIRATION_MINUTES,
            jwt: JwtConfig::default(),
            production: false,
            database_url: None,
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl GateConfig {
    /// Defaults overlaid with `MINIAUTH_*` environment variables.
    ///
    /// `JWT_SECRET` and `DATABASE_URL` are honoured as fallbacks.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(prefix) = lookup("MINIAUTH_ROUTE_PREFIX") {
            cfg.route_prefix = prefix.trim_matches('/').to_string();
        }
        if let Some(minutes) = lookup("MINIAUTH_EXPIRATION_MINUTES") {
            match minutes.trim().parse::<i64>() {
                Ok(m) if (1..=MAX_EXPIRATION_MINUTES).contains(&m) => cfg.expiration_minutes = m,
                _ => tracing::warn!(
                    value = %minutes,
                    max = MAX_EXPIRATION_MINUTES,
                    "ignoring invalid MINIAUTH_EXPIRATION_MINUTES"
                ),
            }
        }
        if let Some(secret) = lookup("MINIAUTH_JWT_SECRET").or_else(|| lookup("JWT_SECRET")) {
            cfg.jwt.secret = secret;
        }
        if let Some(issuer) = lookup("MINIAUTH_JWT_ISSUER") {
            cfg.jwt.issuer = Some(issuer).filter(|s| !s.is_empty());
        }
        if let Some(production) = lookup("MINIAUTH_PRODUCTION") {
            cfg.production = matches!(production.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(url) = lookup("MINIAUTH_DATABASE_URL").or_else(|| lookup("DATABASE_URL")) {
            cfg.database_url = Some(url);
        }
        if let Some(addr) = lookup("MINIAUTH_BIND_ADDR") {
            cfg.bind_addr = addr;
        }

        cfg
    }

    pub fn prefix(&self) -> ManagedPrefix {
        ManagedPrefix::new(&self.route_prefix)
    }
}

/// The path prefix under which the admin surface lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedPrefix {
    /// Normalized as `/segment`, lower-cased.
    root: String,
}

impl ManagedPrefix {
    pub fn new(prefix: &str) -> Self {
        Self {
            root: format!("/{}", prefix.trim_matches('/').to_ascii_lowercase()),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Segment-aware containment: `/miniauth` and `/miniauth/x`, not `/miniauthx`.
    pub fn contains(&self, path: &str) -> bool {
        let Some(rest) = strip_prefix_ignore_case(path, &self.root) else {
            return false;
        };
        rest.is_empty() || rest.starts_with('/')
    }

    /// Absolute path of a resource under the prefix, e.g. `path("login")`.
    pub fn path(&self, sub: &str) -> String {
        format!("{}/{}", self.root, sub.trim_start_matches('/'))
    }

    pub fn login_page(&self) -> String {
        self.path("login.html")
    }
}

fn strip_prefix_ignore_case<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if path.len() < prefix.len() || !path.is_char_boundary(prefix.len()) {
        return None;
    }
    let (head, rest) = path.split_at(prefix.len());
    head.eq_ignore_ascii_case(prefix).then_some(rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn prefix_matching_is_segment_aware() {
        let p = ManagedPrefix::new("miniauth");
        assert!(p.contains("/miniauth"));
        assert!(p.contains("/miniauth/api/getRoles"));
        assert!(p.contains("/MiniAuth/index.html"));
        assert!(!p.contains("/miniauthx"));
        assert!(!p.contains("/api/miniauth"));
        assert_eq!(p.login_page(), "/miniauth/login.html");
    }

    #[test]
    fn env_overrides_defaults() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("MINIAUTH_ROUTE_PREFIX", "/auth/"),
            ("JWT_SECRET", "s3cr3t"),
            ("MINIAUTH_EXPIRATION_MINUTES", "15"),
            ("MINIAUTH_PRODUCTION", "true"),
        ]);
        let cfg = GateConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.route_prefix, "auth");
        assert_eq!(cfg.jwt.secret, "s3cr3t");
        assert_eq!(cfg.expiration_minutes, 15);
        assert!(cfg.production);
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.prefix().root(), "/auth");
    }

    #[test]
    fn out_of_range_expiration_keeps_default() {
        for bad in ["0", "-5", "abc", "527041", "9223372036854775807"] {
            let cfg = GateConfig::from_lookup(|k| {
                (k == "MINIAUTH_EXPIRATION_MINUTES").then(|| bad.to_string())
            });
            assert_eq!(cfg.expiration_minutes, DEFAULT_EXPIRATION_MINUTES, "value {bad}");
        }

        let cfg = GateConfig::from_lookup(|k| {
            (k == "MINIAUTH_EXPIRATION_MINUTES").then(|| MAX_EXPIRATION_MINUTES.to_string())
        });
        assert_eq!(cfg.expiration_minutes, MAX_EXPIRATION_MINUTES);
    }
}
