//! Caller identity and approval permissions.
//!
//! Authentication happens at the gateway, which forwards the verified actor
//! in `x-actor-id` and a comma-separated role list in `x-actor-roles`.

pub mod permissions;

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use serde::Serialize;

use crate::errors::ServiceError;

pub use permissions::{roles, PermissionChecker, RolePermissionChecker};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLES_HEADER: &str = "x-actor-roles";

/// The authenticated caller of a workflow operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub actor_id: String,
    pub roles: Vec<String>,
}

impl Actor {
    pub fn new(actor_id: impl Into<String>, roles: &[&str]) -> Self {
        Self {
            actor_id: actor_id.into(),
            roles: roles.iter().map(|r| r.to_ascii_uppercase()).collect(),
        }
    }

    /// Check if the actor has a specific role (case-insensitive)
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }

    fn from_headers(parts: &Parts) -> Result<Self, ServiceError> {
        let actor_id = parts
            .headers
            .get(ACTOR_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ServiceError::Unauthorized("missing actor identity".to_string()))?;

        let roles = parts
            .headers
            .get(ACTOR_ROLES_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_ascii_uppercase)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            actor_id: actor_id.to_string(),
            roles,
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Actor::from_headers(parts)
    }
}
