use serde::{Deserialize, Serialize};

/// Where an endpoint entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EndpointType {
    /// Discovered from the host router at startup.
    #[default]
    System,
    /// Authored through the admin surface.
    Custom,
}

impl EndpointType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointType::System => "system",
            EndpointType::Custom => "custom",
        }
    }

    /// Lenient parse for stored values; anything unknown is treated as custom.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("system") {
            EndpointType::System
        } else {
            EndpointType::Custom
        }
    }
}

impl core::fmt::Display for EndpointType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-route access descriptor consulted on every request.
///
/// Descriptors are immutable once published to the registry; a change is a
/// whole new descriptor replacing the old one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoleEndpoint {
    pub id: String,
    #[serde(default)]
    pub r#type: EndpointType,
    pub name: String,
    pub route: String,
    #[serde(default)]
    pub methods: Vec<String>,
    /// `false` disables the check entirely (not the same as "no roles").
    pub enable: bool,
    /// `None` or empty: any authenticated principal.
    #[serde(default)]
    pub roles: Option<Vec<String>>,
    pub redirect_to_login_page: bool,
}

impl RoleEndpoint {
    /// Descriptor for a route discovered from the host router.
    pub fn system(
        id: impl Into<String>,
        route: impl Into<String>,
        methods: Vec<String>,
        api_style: bool,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            r#type: EndpointType::System,
            route: route.into(),
            methods,
            enable: true,
            roles: None,
            redirect_to_login_page: !api_style,
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_enable(mut self, enable: bool) -> Self {
        self.enable = enable;
        self
    }

    /// Roles required by this endpoint, empty when any principal is accepted.
    pub fn required_roles(&self) -> &[String] {
        self.roles.as_deref().unwrap_or_default()
    }

    /// Produce the descriptor that results from an admin update.
    pub fn apply(&self, update: &EndpointUpdate) -> Self {
        Self {
            enable: update.enable,
            roles: update.roles.clone(),
            redirect_to_login_page: update.redirect_to_login_page,
            ..self.clone()
        }
    }
}

/// The mutable subset of an endpoint, as edited through the admin surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointUpdate {
    pub enable: bool,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
    pub redirect_to_login_page: bool,
}
