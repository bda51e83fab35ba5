use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::db::{Repository, User, UserSession};
use crate::error::{AppError, AuthError, DatabaseError, FieldErrors};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub exp: i64,    // Expiration time
    pub iat: i64,    // Issued at
    pub jti: String, // Distinguishes tokens issued in the same second
}

/// Issues and validates session tokens. A token is valid only while its
/// JWT signature verifies and its session row exists and has not expired.
pub struct AuthService {
    repo: Arc<dyn Repository>,
    jwt_secret: String,
    token_expiry_hours: i64,
}

impl AuthService {
    pub fn new(repo: Arc<dyn Repository>, jwt_secret: String, token_expiry_hours: i64) -> Self {
        Self {
            repo,
            jwt_secret,
            token_expiry_hours,
        }
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<User, AppError> {
        let email = email.trim();
        let mut errors = FieldErrors::new();
        if email.is_empty() {
            errors.add("email", "This field may not be blank.");
        } else if !is_plausible_email(email) {
            errors.add("email", "Enter a valid email address.");
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            errors.add(
                "password",
                format!(
                    "This password is too short. It must contain at least {} characters.",
                    MIN_PASSWORD_LEN
                ),
            );
        }
        errors.into_result(())?;

        if self.repo.get_user_by_email(email).await?.is_some() {
            return Err(AppError::field("email", "A user with that email already exists."));
        }

        let display_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        let user = User::new(email.to_string(), hash_password(password)?, display_name);

        match self.repo.create_user(&user).await {
            Ok(user) => {
                info!("Registered user {}", user.id);
                Ok(user)
            }
            Err(DatabaseError::Duplicate) => Err(AppError::field(
                "email",
                "A user with that email already exists.",
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Verifies credentials and opens a new session, returning its token.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .repo
            .get_user_by_email(email.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash) {
            warn!("Password mismatch for user {}", user.id);
            return Err(AuthError::InvalidCredentials.into());
        }
        if !user.is_active {
            return Err(AuthError::InactiveUser.into());
        }

        let token = self.generate_token(user.id)?;
        let session = UserSession::new(user.id, token.clone(), self.token_expiry_hours);
        self.repo.create_session(&session).await?;
        self.repo.record_login(user.id).await?;

        Ok(token)
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let session = self
            .repo
            .get_session_by_token(token)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if session.is_expired() {
            debug!("Session {} expired", session.id);
            return Err(AuthError::TokenExpired.into());
        }

        let claims = self.decode_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        if user_id != session.user_id {
            return Err(AuthError::InvalidToken.into());
        }

        let user = self
            .repo
            .get_user_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        if !user.is_active {
            return Err(AuthError::InactiveUser.into());
        }

        self.repo.update_session_activity(token).await?;

        Ok(user)
    }

    pub async fn invalidate_token(&self, token: &str) -> Result<(), AppError> {
        if self.repo.get_session_by_token(token).await?.is_none() {
            return Err(AuthError::InvalidToken.into());
        }
        self.repo.delete_session(token).await?;
        Ok(())
    }

    fn generate_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + Duration::hours(self.token_expiry_hours)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;

        Ok(token)
    }

    fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )?;

        Ok(claims.claims)
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}
