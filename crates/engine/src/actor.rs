//! The acting user, threaded explicitly through every operation.
//!
//! The engine never reads ambient session state: the identity layer resolves
//! `(user id, role, active)` once per request and hands the engine an
//! [`Actor`] value. Client-supplied roles are never trusted.

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// System-wide role tiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    StandardUser,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StandardUser => "standard_user",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }

    /// Admins and super admins may review and transition other users' records.
    pub fn is_privileged(self) -> bool {
        matches!(self, Self::Admin | Self::SuperAdmin)
    }
}

impl TryFrom<&str> for Role {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "standard_user" => Ok(Self::StandardUser),
            "admin" => Ok(Self::Admin),
            "super_admin" => Ok(Self::SuperAdmin),
            other => Err(EngineError::Validation(format!("invalid role: {other}"))),
        }
    }
}

/// The current actor as resolved by the identity collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actor {
    pub id: i32,
    pub role: Role,
    pub active: bool,
}

impl Actor {
    #[must_use]
    pub fn new(id: i32, role: Role) -> Self {
        Self {
            id,
            role,
            active: true,
        }
    }

    pub fn is_privileged(&self) -> bool {
        self.active && self.role.is_privileged()
    }
}
