use axum_extra::headers::authorization::Bearer;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

impl Claims {
    /// The authenticated user's id. Tokens are minted by the auth
    /// collaborator with a UUID subject; anything else is rejected.
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::AuthenticationError("Invalid token subject".to_string()))
    }
}

pub fn authenticate(bearer: &Bearer, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::AuthenticationError(e.to_string()))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_requires_a_uuid_subject() {
        let claims = Claims {
            sub: "6f9619ff-8b86-4d01-b42d-00cf4fc964ff".to_string(),
            role: "user".to_string(),
            exp: 0,
        };
        assert!(claims.user_id().is_ok());

        let bad = Claims {
            sub: "not-a-uuid".to_string(),
            role: "user".to_string(),
            exp: 0,
        };
        assert!(bad.user_id().is_err());
    }
}
