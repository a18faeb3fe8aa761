//! Authentication service for operator registration, login and tokens

use std::sync::Arc;
use std::time::Duration as StdDuration;

use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::check;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::User;
use crate::store::{with_deadline, Store};
use shared::validation::validate_password;

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    timeout: StdDuration,
    jwt_secret: String,
    access_token_expiry: i64,
    bcrypt_cost: u32,
}

/// Input for registering an operator account
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub password: String,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

/// Issued access token with the account it belongs to
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Self {
        Self {
            store,
            timeout: config.ledger.transaction_timeout(),
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
            bcrypt_cost: config.jwt.bcrypt_cost,
        }
    }

    /// Register a new operator and sign them in
    pub async fn register(&self, input: RegisterInput) -> AppResult<AuthResponse> {
        input.validate()?;
        check("password", validate_password(&input.password))?;

        let password_hash = hash(&input.password, self.bcrypt_cost)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: input.name,
            email: input.email.to_lowercase(),
            created_at: now,
            updated_at: now,
        };

        with_deadline(self.timeout, async {
            let mut tx = self.store.begin().await?;
            tx.insert_user(&user, &password_hash).await?;
            tx.commit().await?;
            Ok(())
        })
        .await?;

        tracing::info!(user_id = %user.id, "User registered");
        self.issue(user)
    }

    /// Authenticate with email and password
    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthResponse> {
        let found = with_deadline(self.timeout, async {
            let mut tx = self.store.begin().await?;
            tx.find_user_by_email(email).await
        })
        .await?;

        let (user, password_hash) = found.ok_or(AppError::InvalidCredentials)?;

        let valid = verify(password, &password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "User logged in");
        self.issue(user)
    }

    /// The account behind a token subject
    pub async fn profile(&self, user_id: Uuid) -> AppResult<User> {
        with_deadline(self.timeout, async {
            let mut tx = self.store.begin().await?;
            tx.find_user(user_id)
                .await?
                .ok_or_else(|| AppError::NotFound("User".to_string()))
        })
        .await
    }

    /// Validate access token and return claims
    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AppError::TokenExpired,
            _ => AppError::InvalidToken,
        })
    }

    fn issue(&self, user: User) -> AppResult<AuthResponse> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            exp: (now + Duration::seconds(self.access_token_expiry)).timestamp(),
            iat: now.timestamp(),
        };

        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

        Ok(AuthResponse {
            user,
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }
}
