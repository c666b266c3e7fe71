/**
 * DOMAIN LAYER - Request Actor
 *
 * Single identity value constructed at the HTTP boundary. The upstream API
 * gateway validates the caller's token and forwards identity as trusted
 * headers; this service is internal-only and never sees raw credentials.
 */

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    User,
    Organizer,
    Validator,
    Admin,
}

impl Role {
    fn parse(s: &str) -> Role {
        match s {
            "organizer" => Role::Organizer,
            "validator" => Role::Validator,
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    /**
     * Build an Actor from the x-user-id / x-user-role headers
     *
     * Missing or unparseable user id is Unauthorized. An absent role header
     * defaults to the plain user role.
     */
    pub fn from_headers(headers: &HeaderMap) -> Result<Actor> {
        let user_id = headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or(AppError::Unauthorized)?;

        let role = headers
            .get("x-user-role")
            .and_then(|v| v.to_str().ok())
            .map(Role::parse)
            .unwrap_or(Role::User);

        Ok(Actor { user_id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn missing_user_id_is_unauthorized() {
        let headers = HeaderMap::new();
        assert!(matches!(Actor::from_headers(&headers), Err(AppError::Unauthorized)));
    }

    #[test]
    fn role_defaults_to_user() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("4b4bd0a5-3f5f-4f2c-9c39-0a8df3a2f111"));
        let actor = Actor::from_headers(&headers).unwrap();
        assert_eq!(actor.role, Role::User);
    }

    #[test]
    fn validator_role_is_recognized() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("4b4bd0a5-3f5f-4f2c-9c39-0a8df3a2f111"));
        headers.insert("x-user-role", HeaderValue::from_static("validator"));
        let actor = Actor::from_headers(&headers).unwrap();
        assert_eq!(actor.role, Role::Validator);
    }
}
