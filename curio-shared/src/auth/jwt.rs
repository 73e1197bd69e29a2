/// JWT token issuance and validation
///
/// Bearer tokens are signed with HS256. Two token types exist: a
/// short-lived access token presented on every authenticated request,
/// and a long-lived refresh token exchangeable for a new access token.
///
/// # Example
///
/// ```
/// use curio_shared::auth::jwt::{create_token, validate_access_token, Claims, TokenType};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let claims = Claims::new(42, TokenType::Access);
/// let token = create_token(&claims, "a-secret-key-of-at-least-32-bytes!!")?;
///
/// let validated = validate_access_token(&token, "a-secret-key-of-at-least-32-bytes!!")?;
/// assert_eq!(validated.sub, 42);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Token issuer claim value
const ISSUER: &str = "curio";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token type did not match the expected type
    #[error("Wrong token type: expected {expected}, got {actual}")]
    WrongTokenType {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Access token (short-lived, 24 hours)
    Access,

    /// Refresh token (long-lived, 30 days)
    Refresh,
}

impl TokenType {
    /// Default expiration duration for the token type
    pub fn default_expiration(&self) -> Duration {
        match self {
            TokenType::Access => Duration::hours(24),
            TokenType::Refresh => Duration::days(30),
        }
    }

    /// Token type as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// JWT claims structure
///
/// Standard claims (`sub`, `iss`, `iat`, `exp`, `nbf`) plus the token
/// type. The subject is the user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user ID
    pub sub: i64,

    /// Issuer - always "curio"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Token type (custom claim)
    pub token_type: TokenType,
}

impl Claims {
    /// Creates new claims with the default expiration for the type
    pub fn new(user_id: i64, token_type: TokenType) -> Self {
        let now = Utc::now();
        let expiration = now + token_type.default_expiration();

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
            token_type,
        }
    }

    /// Creates claims with a custom expiration
    pub fn with_expiration(user_id: i64, token_type: TokenType, expires_in: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
            token_type,
        }
    }
}

/// Creates a signed token from claims
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::CreateError(e.to_string()))
}

/// Validates a token's signature, expiry, and issuer
///
/// # Errors
///
/// Returns `JwtError::Expired` for expired tokens and
/// `JwtError::ValidationError` for any other failure.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        _ => JwtError::ValidationError(e.to_string()),
    })
}

/// Validates a token and requires it to be an access token
///
/// Refresh tokens must not be usable directly against the API.
///
/// # Errors
///
/// Returns `JwtError::WrongTokenType` when handed a refresh token.
pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != TokenType::Access {
        return Err(JwtError::WrongTokenType {
            expected: TokenType::Access.as_str(),
            actual: claims.token_type.as_str(),
        });
    }

    Ok(claims)
}

/// Exchanges a valid refresh token for a new access token
///
/// # Errors
///
/// Returns `JwtError::WrongTokenType` when handed an access token, or
/// the underlying validation error.
pub fn refresh_access_token(refresh_token: &str, secret: &str) -> Result<String, JwtError> {
    let claims = validate_token(refresh_token, secret)?;

    if claims.token_type != TokenType::Refresh {
        return Err(JwtError::WrongTokenType {
            expected: TokenType::Refresh.as_str(),
            actual: claims.token_type.as_str(),
        });
    }

    let access_claims = Claims::new(claims.sub, TokenType::Access);
    create_token(&access_claims, secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_create_and_validate_token() {
        let claims = Claims::new(7, TokenType::Access);
        let token = create_token(&claims, SECRET).expect("Token creation should succeed");

        let validated = validate_token(&token, SECRET).expect("Validation should succeed");
        assert_eq!(validated.sub, 7);
        assert_eq!(validated.iss, "curio");
        assert_eq!(validated.token_type, TokenType::Access);
    }

    #[test]
    fn test_validate_token_wrong_secret() {
        let claims = Claims::new(7, TokenType::Access);
        let token = create_token(&claims, SECRET).expect("Token creation should succeed");

        assert!(validate_token(&token, "a-completely-different-secret-key!!").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        // Well past the validator's default clock-skew leeway
        let claims = Claims::with_expiration(7, TokenType::Access, Duration::hours(-2));
        let token = create_token(&claims, SECRET).expect("Token creation should succeed");

        match validate_token(&token, SECRET) {
            Err(JwtError::Expired) => {}
            other => panic!("expected Expired, got {:?}", other),
        }
    }

    #[test]
    fn test_access_validation_rejects_refresh_token() {
        let claims = Claims::new(7, TokenType::Refresh);
        let token = create_token(&claims, SECRET).expect("Token creation should succeed");

        match validate_access_token(&token, SECRET) {
            Err(JwtError::WrongTokenType { expected, actual }) => {
                assert_eq!(expected, "access");
                assert_eq!(actual, "refresh");
            }
            other => panic!("expected WrongTokenType, got {:?}", other),
        }
    }

    #[test]
    fn test_refresh_flow() {
        let refresh_claims = Claims::new(7, TokenType::Refresh);
        let refresh_token =
            create_token(&refresh_claims, SECRET).expect("Token creation should succeed");

        let access_token =
            refresh_access_token(&refresh_token, SECRET).expect("Refresh should succeed");
        let access_claims =
            validate_access_token(&access_token, SECRET).expect("Validation should succeed");

        assert_eq!(access_claims.sub, 7);
        assert_eq!(access_claims.token_type, TokenType::Access);
    }

    #[test]
    fn test_refresh_rejects_access_token() {
        let claims = Claims::new(7, TokenType::Access);
        let token = create_token(&claims, SECRET).expect("Token creation should succeed");

        assert!(refresh_access_token(&token, SECRET).is_err());
    }

    #[test]
    fn test_token_type_expirations() {
        assert_eq!(TokenType::Access.default_expiration(), Duration::hours(24));
        assert_eq!(TokenType::Refresh.default_expiration(), Duration::days(30));
    }
}
