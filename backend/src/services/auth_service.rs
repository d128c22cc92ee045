//! JWT verification and re-signing.
//!
//! Tokens are issued elsewhere in the platform and shared via an HS256
//! secret. The service verifies incoming tokens and re-signs the same claims
//! when calling the incident-query service on the user's behalf.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// User type allowed to read company incidents.
pub const COMPANY_USER_TYPE: &str = "company";

/// Token claims. Unknown claims are kept so they survive re-signing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Claims {
    pub fn new(sub: impl Into<String>, user_type: Option<&str>) -> Self {
        Self {
            sub: sub.into(),
            user_type: user_type.map(str::to_string),
            exp: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn expires_at(mut self, exp: u64) -> Self {
        self.exp = Some(exp);
        self
    }
}

#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthService {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // `exp` is checked when present but not required
        validation.required_spec_claims.clear();
        validation.validate_exp = true;
        validation.validate_aud = false;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn decode(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    pub fn encode(&self, claims: &Claims) -> Result<String> {
        Ok(encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.encoding_key,
        )?)
    }
}
