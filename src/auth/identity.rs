use axum::http::HeaderMap;
use serde::Deserialize;

use crate::error::{Error, Result};

/// How login identities are established. The mode is a single injected
/// configuration value; handlers never branch on environment flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthenticationMode {
    /// Trust identity headers set by the SSO proxy in front of the server.
    #[default]
    Proxy,
    /// Trust x-mock-* headers; for tests and local development only.
    Mock,
}

impl AuthenticationMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "proxy" => Some(Self::Proxy),
            "mock" => Some(Self::Mock),
            _ => None,
        }
    }

    const fn header_prefix(self) -> &'static str {
        match self {
            Self::Proxy => "x-remote",
            Self::Mock => "x-mock",
        }
    }
}

/// Identity asserted by the upstream identity provider for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// IAM group membership strings, as delivered by the provider.
    pub groups: Vec<String>,
}

/// IAM groups that map onto role flags at the authentication boundary.
#[derive(Debug, Clone, Deserialize)]
pub struct IamConfig {
    pub admin_group: String,
    pub employee_group: String,
}

impl Default for IamConfig {
    fn default() -> Self {
        Self {
            admin_group: "grp-prethesis-admins".to_string(),
            employee_group: "hy-employees".to_string(),
        }
    }
}

impl IamConfig {
    #[must_use]
    pub fn is_admin(&self, identity: &Identity) -> bool {
        identity.groups.iter().any(|g| *g == self.admin_group)
    }

    #[must_use]
    pub fn is_employee(&self, identity: &Identity) -> bool {
        identity.groups.iter().any(|g| *g == self.employee_group)
    }

    /// A login with neither recognized group is rejected before any
    /// resource-level check.
    #[must_use]
    pub fn is_recognized(&self, identity: &Identity) -> bool {
        self.is_admin(identity) || self.is_employee(identity)
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Reads the asserted identity from request headers according to the
/// configured mode. Groups are semicolon-separated.
pub fn identity_from_headers(mode: AuthenticationMode, headers: &HeaderMap) -> Result<Identity> {
    let prefix = mode.header_prefix();

    let username = header_value(headers, &format!("{prefix}-user"))
        .ok_or(Error::Unauthorized)?;

    let groups = header_value(headers, &format!("{prefix}-groups"))
        .map(|raw| {
            raw.split(';')
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(Identity {
        username,
        email: header_value(headers, &format!("{prefix}-email")),
        first_name: header_value(headers, &format!("{prefix}-givenname")),
        last_name: header_value(headers, &format!("{prefix}-surname")),
        groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                axum::http::HeaderName::try_from(*name).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_proxy_headers_parsed() {
        let map = headers(&[
            ("x-remote-user", "akorhone"),
            ("x-remote-email", "aino.korhonen@example.fi"),
            ("x-remote-givenname", "Aino"),
            ("x-remote-surname", "Korhonen"),
            ("x-remote-groups", "hy-employees;grp-prethesis-admins"),
        ]);
        let identity = identity_from_headers(AuthenticationMode::Proxy, &map).unwrap();
        assert_eq!(identity.username, "akorhone");
        assert_eq!(identity.groups.len(), 2);

        let iam = IamConfig::default();
        assert!(iam.is_admin(&identity));
        assert!(iam.is_employee(&identity));
    }

    #[test]
    fn test_mock_mode_ignores_proxy_headers() {
        let map = headers(&[("x-remote-user", "akorhone")]);
        assert!(identity_from_headers(AuthenticationMode::Mock, &map).is_err());
    }

    #[test]
    fn test_missing_user_header_is_unauthorized() {
        let map = headers(&[("x-remote-groups", "hy-employees")]);
        assert!(matches!(
            identity_from_headers(AuthenticationMode::Proxy, &map),
            Err(Error::Unauthorized)
        ));
    }

    #[test]
    fn test_unrecognized_groups_fail_the_gate() {
        let map = headers(&[
            ("x-mock-user", "visitor"),
            ("x-mock-groups", "some-other-group"),
        ]);
        let identity = identity_from_headers(AuthenticationMode::Mock, &map).unwrap();
        assert!(!IamConfig::default().is_recognized(&identity));
    }
}
