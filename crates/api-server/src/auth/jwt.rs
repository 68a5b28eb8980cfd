use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims of an identity token issued by the sign-in provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub exp: usize,
}

fn identity_validation() -> Validation {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation
}

pub fn issue_identity_jwt(
    secret: &str,
    email: &str,
    name: Option<&str>,
    ttl_hours: i64,
) -> Result<(String, usize), String> {
    let exp = (Utc::now() + Duration::hours(ttl_hours)).timestamp() as usize;
    let claims = IdentityClaims {
        email: email.to_string(),
        name: name.map(str::to_string),
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map(|token| (token, exp))
    .map_err(|err| format!("Failed to sign identity JWT: {}", err))
}

pub fn verify_identity_jwt(secret: &str, token: &str) -> Result<IdentityClaims, String> {
    decode::<IdentityClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &identity_validation(),
    )
    .map(|decoded| decoded.claims)
    .map_err(|err| format!("Invalid identity JWT: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies() {
        let (token, exp) = issue_identity_jwt("secret", "a@x.com", Some("Alice"), 1).unwrap();
        let claims = verify_identity_jwt("secret", &token).unwrap();
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.name.as_deref(), Some("Alice"));
        assert_eq!(claims.exp, exp);
    }

    #[test]
    fn rejects_wrong_secret() {
        let (token, _) = issue_identity_jwt("secret", "a@x.com", None, 1).unwrap();
        assert!(verify_identity_jwt("other", &token).is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let (token, _) = issue_identity_jwt("secret", "a@x.com", None, -2).unwrap();
        assert!(verify_identity_jwt("secret", &token).is_err());
    }
}
