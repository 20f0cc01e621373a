//! Authenticated user claims and role checks

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

/// Staff role carried in the token, ordered by privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Librarian,
    Admin,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i64,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    pub fn new(user_id: i64, login: &str, role: Role, validity_hours: u64) -> Self {
        let now = Utc::now();
        Self {
            sub: login.to_string(),
            user_id,
            role,
            iat: now.timestamp(),
            exp: (now + Duration::hours(validity_hours as i64)).timestamp(),
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    fn require(&self, role: Role, action: &str) -> Result<(), AppError> {
        if self.role >= role {
            Ok(())
        } else {
            Err(AppError::Authorization(format!("Insufficient rights to {}", action)))
        }
    }

    // Authorization checks
    pub fn require_read_circulation(&self) -> Result<(), AppError> {
        self.require(Role::Librarian, "read circulation data")
    }

    pub fn require_write_circulation(&self) -> Result<(), AppError> {
        self.require(Role::Librarian, "manage transactions")
    }

    pub fn require_write_catalog(&self) -> Result<(), AppError> {
        self.require(Role::Librarian, "manage books")
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        self.require(Role::Admin, "perform administrative actions")
    }
}
