use std::time::Duration;

use anyhow::Context;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};

use crate::{config::JwtConfig, error::AppError};

/// JWT payload: the subject is the username.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 signing and verification keys plus the access token lifetime.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    pub ttl: Duration,
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        let ttl_secs = u64::try_from(cfg.ttl_minutes)
            .unwrap_or(0)
            .saturating_mul(60);
        Self::new(cfg.secret.as_bytes(), Duration::from_secs(ttl_secs))
    }

    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn issue(&self, subject: &str) -> anyhow::Result<String> {
        self.issue_at(subject, OffsetDateTime::now_utc())
    }

    pub fn issue_at(&self, subject: &str, now: OffsetDateTime) -> anyhow::Result<String> {
        let exp = i64::try_from(self.ttl.as_secs())
            .ok()
            .and_then(|secs| now.checked_add(TimeDuration::seconds(secs)))
            .context("token expiry out of range")?;
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(sub = %subject, exp = claims.exp, "jwt signed");
        Ok(token)
    }

    /// Returns the subject of a correctly signed, unexpired token.
    pub fn validate(&self, token: &str) -> Result<String, AppError> {
        self.validate_at(token, OffsetDateTime::now_utc())
    }

    /// Expiry is judged against `now` here rather than inside `jsonwebtoken`,
    /// so callers can supply the clock. A token is expired from `exp` onward.
    pub fn validate_at(&self, token: &str, now: OffsetDateTime) -> Result<String, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            warn!(error = %e, "jwt rejected");
            AppError::InvalidToken
        })?;
        let claims = data.claims;

        if now.unix_timestamp() >= claims.exp {
            warn!(sub = %claims.sub, "jwt expired");
            return Err(AppError::InvalidToken);
        }
        if claims.sub.is_empty() {
            return Err(AppError::InvalidToken);
        }

        debug!(sub = %claims.sub, "jwt verified");
        Ok(claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> JwtKeys {
        JwtKeys::new(b"dev-secret", Duration::from_secs(30 * 60))
    }

    #[test]
    fn issue_and_validate() {
        let keys = make_keys();
        let token = keys.issue("alice").expect("sign");
        assert_eq!(keys.validate(&token).expect("verify"), "alice");
    }

    #[test]
    fn token_lives_exactly_thirty_minutes() {
        let keys = make_keys();
        let issued = OffsetDateTime::now_utc();
        let token = keys.issue_at("alice", issued).unwrap();

        let almost = issued + TimeDuration::minutes(29) + TimeDuration::seconds(59);
        assert_eq!(keys.validate_at(&token, almost).unwrap(), "alice");

        let at_expiry = issued + TimeDuration::minutes(30);
        assert!(matches!(
            keys.validate_at(&token, at_expiry),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn token_issued_long_ago_is_rejected_now() {
        let keys = make_keys();
        let issued = OffsetDateTime::now_utc() - TimeDuration::minutes(31);
        let token = keys.issue_at("alice", issued).unwrap();
        assert!(matches!(keys.validate(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let other = JwtKeys::new(b"another-secret", Duration::from_secs(60));
        let token = other.issue("alice").unwrap();
        assert!(matches!(make_keys().validate(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn oversized_ttl_is_an_error_not_a_panic() {
        let keys = JwtKeys::new(b"dev-secret", Duration::from_secs(u64::MAX));
        assert!(keys.issue("alice").is_err());

        let cfg = JwtConfig {
            secret: "dev-secret".into(),
            ttl_minutes: i64::MAX,
        };
        assert!(JwtKeys::from_config(&cfg).issue("alice").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(make_keys().validate("not.a.jwt").is_err());
        assert!(make_keys().validate("").is_err());
    }

    #[test]
    fn rejects_token_without_subject() {
        #[derive(Serialize)]
        struct NoSub {
            exp: i64,
        }
        let exp = (OffsetDateTime::now_utc() + TimeDuration::minutes(5)).unix_timestamp();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &NoSub { exp },
            &EncodingKey::from_secret(b"dev-secret"),
        )
        .unwrap();
        assert!(matches!(make_keys().validate(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn rejects_empty_subject() {
        let token = make_keys().issue("").unwrap();
        assert!(matches!(make_keys().validate(&token), Err(AppError::InvalidToken)));
    }
}
