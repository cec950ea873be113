//! Actor identity and authorization
//!
//! Authentication happens upstream: the gateway terminates the session
//! and forwards the resolved identity as `x-user-id` / `x-user-role`
//! headers. This module extracts that identity and answers the only two
//! questions the core asks - does the actor own the resource, and does
//! the actor hold an elevated role.

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use shared::AppError;

/// Actor role, as asserted by the gateway
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Staff,
    Admin,
}

impl Role {
    /// Parse from the gateway header value
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "customer" => Some(Self::Customer),
            "staff" => Some(Self::Staff),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Staff and admin run back-office flows: fulfilment transitions,
    /// manual payment verification, refunds, stock adjustment
    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::Staff | Self::Admin)
    }
}

/// Authenticated actor attached to every core operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    /// Internal actor recorded on system-driven transitions (webhook
    /// confirmations)
    pub fn system(source: &str) -> Self {
        Self::new(format!("system:{source}"), Role::Staff)
    }

    pub fn is_elevated(&self) -> bool {
        self.role.is_elevated()
    }

    /// True when the actor owns the resource or holds an elevated role
    pub fn can_access(&self, owner_id: &str) -> bool {
        self.is_elevated() || self.user_id == owner_id
    }
}

/// Actor extractor
///
/// Handlers that need an identity take `actor: Actor` as an argument;
/// requests without the gateway headers are rejected as unauthorized.
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Check if already extracted
        if let Some(actor) = parts.extensions.get::<Actor>() {
            return Ok(actor.clone());
        }

        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|h| h.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or(AppError::Unauthorized)?
            .to_string();

        let role = parts
            .headers
            .get("x-user-role")
            .and_then(|h| h.to_str().ok())
            .and_then(Role::parse)
            .unwrap_or(Role::Customer);

        let actor = Actor { user_id, role };
        parts.extensions.insert(actor.clone());
        Ok(actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("staff"), Some(Role::Staff));
        assert_eq!(Role::parse("customer"), Some(Role::Customer));
        assert_eq!(Role::parse("root"), None);
    }

    #[test]
    fn test_can_access_owner_or_elevated() {
        let customer = Actor::new("u-1", Role::Customer);
        assert!(customer.can_access("u-1"));
        assert!(!customer.can_access("u-2"));

        let staff = Actor::new("s-1", Role::Staff);
        assert!(staff.can_access("u-2"));

        let admin = Actor::new("a-1", Role::Admin);
        assert!(admin.can_access("u-2"));
    }

    #[test]
    fn test_system_actor() {
        let actor = Actor::system("card");
        assert_eq!(actor.user_id, "system:card");
        assert!(actor.is_elevated());
    }
}
