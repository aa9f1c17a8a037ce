// src/services/auth.rs

use bcrypt::verify;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    common::error::AppError,
    db::AdminRepository,
    models::admin::{AdminUser, Claims},
};

#[derive(Clone)]
pub struct AuthService {
    admin_repo: AdminRepository,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(admin_repo: AdminRepository, jwt_secret: String) -> Self {
        Self {
            admin_repo,
            jwt_secret,
        }
    }

    /// Password login for operators. Inactive accounts fail exactly like
    /// wrong passwords, so the response does not reveal which it was.
    pub async fn login(&self, email: &str, password: &str) -> Result<String, AppError> {
        let admin = self
            .admin_repo
            .find_active_by_email(email)
            .await
            .map_err(|e| AppError::TransientError(e.to_string()))?
            .ok_or(AppError::InvalidCredentials)?;

        let password = password.to_owned();
        let password_hash = admin.password_hash.clone();

        // bcrypt is CPU-bound; keep it off the async workers.
        let is_valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
            .await
            .map_err(|e| anyhow::anyhow!("password verification task failed: {e}"))??;

        if !is_valid {
            return Err(AppError::InvalidCredentials);
        }

        self.create_token(&admin)
    }

    /// Decode the bearer token. This only proves identity; authorization is
    /// the Role Resolver's job, on every request.
    pub fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|_| AppError::InvalidToken)?;

        Ok(token_data.claims)
    }

    fn create_token(&self, admin: &AdminUser) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(7);

        let claims = Claims {
            sub: admin.id,
            email: admin.email.clone(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )
        .map_err(|e| AppError::InternalServerError(anyhow::Error::new(e)))
    }
}
