use actix_web::{dev::Payload, http::header::AUTHORIZATION, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;

use crate::db::User;
use crate::error::{AppError, AuthError};
use crate::AppState;

/// The caller resolved from a `Bearer` session token.
///
/// Use `Option<AuthUser>` on endpoints that are readable anonymously.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn user(&self) -> &User {
        &self.0
    }

    pub fn id(&self) -> uuid::Uuid {
        self.0.id
    }

    /// Staff may act on any record; everyone else only on their own.
    pub fn can_modify(&self, owner_id: uuid::Uuid) -> bool {
        self.0.is_staff || self.0.id == owner_id
    }

    pub fn ensure_can_modify(&self, owner_id: uuid::Uuid) -> Result<(), AppError> {
        if self.can_modify(owner_id) {
            Ok(())
        } else {
            Err(AuthError::Forbidden.into())
        }
    }
}

pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = bearer_token(req);

        Box::pin(async move {
            let state = state
                .ok_or_else(|| AppError::InternalError("application state not configured".into()))?;
            let token = token.ok_or(AuthError::MissingToken)?;
            let user = state.auth_service.validate_token(&token).await?;
            Ok(AuthUser(user))
        })
    }
}
