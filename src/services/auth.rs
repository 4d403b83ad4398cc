use std::sync::Arc;

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use tracing::debug;

use crate::errors::AppError;
use crate::types::Dependencies;

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[allow(dead_code)]
    exp: i64,
}

/// Identity established by a validated bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
}

#[derive(Clone)]
pub struct AuthService {
    decoding_key: Arc<DecodingKey>,
    validation: Validation,
}

impl AuthService {
    pub fn new(deps: Arc<Dependencies>) -> Self {
        Self {
            decoding_key: Arc::new(DecodingKey::from_secret(deps.jwt_secret.as_bytes())),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AuthUser, AppError> {
        let Some(raw_header) = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
        else {
            return Err(AppError::unauthorized("missing authorization header"));
        };

        let token = raw_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .unwrap_or_default();

        if token.is_empty() {
            return Err(AppError::unauthorized("missing bearer token"));
        }

        let claims = match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => data.claims,
            Err(err) => {
                debug!("token rejected: {}", err);
                return Err(AppError::unauthorized("invalid token"));
            }
        };

        let user_id = claims.sub.trim();
        if user_id.is_empty() {
            return Err(AppError::unauthorized("token has no subject"));
        }

        Ok(AuthUser {
            id: user_id.to_string(),
        })
    }
}
