use axum::{extract::FromRequestParts, http::header};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::{ConnectionTrait, EntityTrait};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    entity::users::Entity as Users, error::AppError, models::UserRole, state::AppState,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: UserRole,
    pub exp: usize,
}

/// Authenticated caller decoded from the bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl AuthUser {
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self { user_id, role }
    }
}

pub fn ensure_role(user: &AuthUser, role: UserRole) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::PermissionDenied);
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, UserRole::Admin)
}

/// Signs a token for `user_id`. Tokens are normally issued by the identity
/// service; this exists for seeding and local tooling.
pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    role: UserRole,
    ttl: Duration,
) -> Result<String, AppError> {
    let expiration = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;
    let claims = Claims {
        sub: user_id.to_string(),
        role,
        exp: expiration.timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn decode_token(secret: &str, token: &str) -> Result<AuthUser, AppError> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    let user_id = Uuid::parse_str(&decoded.claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;

    Ok(AuthUser::new(user_id, decoded.claims.role))
}

/// Rejects tokens whose account no longer exists or has been blocked.
pub async fn ensure_active<C: ConnectionTrait>(db: &C, user: &AuthUser) -> Result<(), AppError> {
    let account = Users::find_by_id(user.user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Unknown user".into()))?;
    if account.is_blocked {
        tracing::debug!(user_id = %user.user_id, "blocked user rejected");
        return Err(AppError::PermissionDenied);
    }
    Ok(())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?
            .trim();

        let user = decode_token(&state.config.jwt_secret, token)?;
        ensure_active(&state.orm, &user).await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_preserves_role() {
        let id = Uuid::new_v4();
        let token = issue_token("secret", id, UserRole::Delivery, Duration::hours(1)).unwrap();
        let user = decode_token("secret", &token).unwrap();
        assert_eq!(user.user_id, id);
        assert_eq!(user.role, UserRole::Delivery);
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let token = issue_token("secret", Uuid::new_v4(), UserRole::Buyer, Duration::hours(1)).unwrap();
        assert!(matches!(
            decode_token("other", &token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn role_checks() {
        let admin = AuthUser::new(Uuid::nil(), UserRole::Admin);
        let buyer = AuthUser::new(Uuid::nil(), UserRole::Buyer);
        assert!(ensure_admin(&admin).is_ok());
        assert!(matches!(ensure_admin(&buyer), Err(AppError::PermissionDenied)));
    }
}
