//! Authentication models and utilities

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::user::User;
use crate::models::UserRole;

/// JWT token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub email: String,
    pub role: UserRole,
    pub iat: i64,    // Issued at
    pub exp: i64,    // Expiration
    pub iss: String, // Issuer
}

impl Claims {
    /// Create new claims for a user
    pub fn new(user: &User, expiration: i64, issuer: String) -> Self {
        let now = Utc::now();
        Self {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: now.timestamp() + expiration,
            iss: issuer,
        }
    }
}

/// Issued session token
#[derive(Debug, Clone, Serialize)]
pub struct SessionToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

/// JWT token service
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    expiration: i64,
}

impl JwtService {
    /// Create new JWT service
    pub fn new(secret: &str, issuer: String, expiration: i64) -> Result<Self, AppError> {
        if secret.len() < 32 {
            return Err(AppError::Config(
                "JWT secret must be at least 32 characters long".to_string(),
            ));
        }

        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.set_issuer(&[&issuer]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            validation,
            issuer,
            expiration,
        })
    }

    /// Issue a session token for a user
    pub fn issue(&self, user: &User) -> Result<SessionToken, AppError> {
        let claims = Claims::new(user, self.expiration, self.issuer.clone());
        let access_token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Authentication(format!("Failed to encode token: {}", e)))?;

        Ok(SessionToken {
            access_token,
            token_type: "Bearer",
            expires_in: self.expiration.max(0) as u64,
        })
    }

    /// Verify and decode token
    pub fn verify_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AppError::Authentication(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }
}

/// Password utilities
pub struct PasswordUtils;

impl PasswordUtils {
    /// Hash password with bcrypt
    pub fn hash_password(password: &str) -> Result<String, AppError> {
        Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
    }

    /// Verify password against hash
    pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
        Ok(bcrypt::verify(password, hash)?)
    }

    /// Validate password strength
    pub fn validate_password_strength(password: &str) -> Result<(), AppError> {
        if password.len() < 8 {
            return Err(AppError::BadRequest(
                "Password must be at least 8 characters long".to_string(),
            ));
        }

        if password.len() > 128 {
            return Err(AppError::BadRequest(
                "Password must be less than 128 characters long".to_string(),
            ));
        }

        if !password.chars().any(|c| c.is_uppercase()) {
            return Err(AppError::BadRequest(
                "Password must contain at least one uppercase letter".to_string(),
            ));
        }

        if !password.chars().any(|c| c.is_lowercase()) {
            return Err(AppError::BadRequest(
                "Password must contain at least one lowercase letter".to_string(),
            ));
        }

        if !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(AppError::BadRequest(
                "Password must contain at least one digit".to_string(),
            ));
        }

        Ok(())
    }
}

/// Authenticated caller for the current request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl TryFrom<Claims> for AuthContext {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Authentication("Invalid user ID in token".to_string()))?;

        Ok(Self {
            user_id,
            email: claims.email,
            role: claims.role,
        })
    }
}

impl AuthContext {
    /// Check if user has one of the given roles
    pub fn has_any_role(&self, roles: &[UserRole]) -> bool {
        roles.contains(&self.role)
    }
}
