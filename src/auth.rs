use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::errors::BackendError;
use crate::user::UserRole;

/// Bearer tokens are valid for 24 hours.
pub const TOKEN_LIFETIME_SECONDS: i64 = 24 * 60 * 60;

/// JWT claims embedded in every bearer token.
#[derive(Debug, Deserialize, Serialize)]
pub struct Claims {
    /// Subject — the user ID.
    pub sub: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

/// HS256 token signing configuration.
pub struct AuthConfig {
    secret: String,
}

impl AuthConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        AuthConfig {
            secret: secret.into(),
        }
    }

    pub fn from_env() -> Self {
        use crate::config::get_variable;

        AuthConfig::new(get_variable("BACKEND_JWT_SECRET"))
    }

    /// Issues a signed token whose subject is the given user.
    pub fn issue_token(&self, user_id: &Uuid) -> Result<String, BackendError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now + TOKEN_LIFETIME_SECONDS,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| BackendError::Crypto {
            message: format!("token encoding failed: {}", e),
        })
    }

    /// Verifies a token's signature and expiry and returns its subject.
    pub fn verify_token(&self, token: &str) -> Result<Uuid, BackendError> {
        let validation = Validation::new(Algorithm::HS256);

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                BackendError::unauthenticated("Token expired")
            }
            _ => BackendError::unauthenticated("Invalid token"),
        })?;

        Uuid::parse_str(&data.claims.sub)
            .map_err(|_| BackendError::unauthenticated("Invalid token"))
    }
}

/// The requester attached to every authenticated request: identity,
/// platform role and the groups they belong to.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: UserRole,
    pub groups: Vec<Uuid>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.splitn(2, ' ');
    match (parts.next(), parts.next()) {
        (Some("Bearer"), Some(token)) if !token.is_empty() => Some(token),
        _ => None,
    }
}

/// Hashes a password with Argon2id, producing a PHC-format string.
pub fn hash_password(password: &str) -> Result<String, BackendError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| BackendError::Crypto {
            message: format!("hashing failed: {}", e),
        })
}

/// Verifies a plaintext password against a stored PHC-format hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, BackendError> {
    let parsed = PasswordHash::new(hash).map_err(|e| BackendError::Crypto {
        message: format!("invalid stored hash: {}", e),
    })?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(BackendError::Crypto {
            message: format!("verification failed: {}", e),
        }),
    }
}
