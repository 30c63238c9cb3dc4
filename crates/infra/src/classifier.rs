//! Request-to-endpoint resolution.

use miniauth_auth::Classification;

use crate::{EndpointRegistry, ManagedPrefix};

/// Resolve a request to the endpoint that governs it.
///
/// Admin-surface paths are looked up by lower-cased path because not all of
/// them are router-visible (static assets, the login page). Everything else
/// is looked up by the route the host router matched; no match means the
/// request is not ours to judge.
pub fn classify(
    registry: &EndpointRegistry,
    prefix: &ManagedPrefix,
    path: &str,
    matched_route: Option<&str>,
) -> Classification {
    if prefix.contains(path) {
        return match registry.get(&path.to_ascii_lowercase()) {
            Some(ep) => Classification::Endpoint(ep),
            None => Classification::AdminUnregistered,
        };
    }

    matched_route
        .and_then(|route| registry.get(route))
        .map(Classification::Endpoint)
        .unwrap_or(Classification::Unmanaged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use miniauth_auth::RoleEndpoint;

    fn registry() -> EndpointRegistry {
        let reg = EndpointRegistry::new();
        reg.upsert(RoleEndpoint::system("/orders/:id", "/orders/:id", vec!["GET".into()], true));
        reg.upsert(RoleEndpoint::system(
            "/miniauth/api/getroles",
            "/miniauth/api/getRoles",
            vec!["GET".into()],
            true,
        ));
        reg
    }

    #[test]
    fn routed_request_resolves_by_matched_route() {
        let c = classify(&registry(), &ManagedPrefix::new("miniauth"), "/orders/42", Some("/orders/:id"));
        assert_eq!(c.endpoint().map(|e| e.id.as_str()), Some("/orders/:id"));
    }

    #[test]
    fn admin_path_resolves_by_lowercased_path() {
        let c = classify(&registry(), &ManagedPrefix::new("miniauth"), "/MiniAuth/api/getRoles", None);
        assert_eq!(c.endpoint().map(|e| e.id.as_str()), Some("/miniauth/api/getroles"));
    }

    #[test]
    fn unregistered_admin_path_is_flagged() {
        let c = classify(&registry(), &ManagedPrefix::new("miniauth"), "/miniauth/login.html", None);
        assert_eq!(c, Classification::AdminUnregistered);
    }

    #[test]
    fn unmatched_or_unregistered_routes_are_unmanaged() {
        let reg = registry();
        let prefix = ManagedPrefix::new("miniauth");
        assert_eq!(classify(&reg, &prefix, "/nowhere", None), Classification::Unmanaged);
        assert_eq!(classify(&reg, &prefix, "/health", Some("/health")), Classification::Unmanaged);
    }
}
