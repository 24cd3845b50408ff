use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Session token claims minted by the identity gateway.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user id at the identity provider
    pub exp: usize,
    pub jti: String,
    /// Opaque provider credential, carried for non-core routes only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

/// The authenticated identity attached to a request by the auth gate.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub access_token: Option<String>,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            access_token: claims.access_token,
        }
    }
}

pub fn create_jwt(user_id: &str, access_token: Option<&str>, secret: &str) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(24))
        .ok_or_else(|| anyhow::anyhow!("expiration overflow"))?
        .timestamp();

    let claims = Claims {
        sub: user_id.to_owned(),
        exp: expiration as usize,
        jti: uuid::Uuid::new_v4().to_string(),
        access_token: access_token.map(str::to_owned),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;

    Ok(token)
}

pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_cycle() {
        let secret = "test_secret";
        let token = create_jwt("user_123", Some("fb-token"), secret).unwrap();
        let identity = Identity::from(validate_jwt(&token, secret).unwrap());
        assert_eq!(identity.user_id, "user_123");
        assert_eq!(identity.access_token.as_deref(), Some("fb-token"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_jwt("user_123", None, "one").unwrap();
        assert!(validate_jwt(&token, "two").is_err());
    }
}
