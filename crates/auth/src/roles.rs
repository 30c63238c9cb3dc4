use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Id (and name) of the role seeded for administrators of the gate itself.
pub const ADMIN_ROLE_ID: &str = "miniauth-admin";

/// Role record as managed through the admin surface.
///
/// `enable` is stored and editable but the decision engine does not consult
/// it: a disabled role keeps granting access to principals that already hold it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Role {
    pub id: String,
    pub name: String,
    pub enable: bool,
    #[serde(default)]
    pub r#type: Option<String>,
}

impl Role {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            enable: true,
            r#type: None,
        }
    }

    pub fn with_type(mut self, ty: impl Into<String>) -> Self {
        self.r#type = Some(ty.into());
        self
    }
}

/// Set-intersection test between the roles a principal holds and the roles an
/// endpoint requires. A principal without roles never matches.
pub fn roles_intersect(held: Option<&[String]>, required: &[String]) -> bool {
    let Some(held) = held else {
        return false;
    };

    let held: HashSet<&str> = held.iter().map(String::as_str).collect();
    required.iter().any(|r| held.contains(r.as_str()))
}
