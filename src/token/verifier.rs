use super::{claims::AccessClaims, error::ConfigurationError, error::VerificationError};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

/// Result of checking an access token.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Signature checks out. `exp` may still be missing; see [`AccessClaims::exp`].
    Valid(AccessClaims),
    /// Signature checks out but `now >= exp`.
    Expired { exp: i64 },
    Invalid(VerificationError),
}

impl Outcome {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// HS256 access-token verifier bound to the process-wide access secret.
pub struct AccessVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for AccessVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessVerifier")
            .field("key", &"***")
            .field("algorithms", &self.validation.algorithms)
            .finish()
    }
}

impl AccessVerifier {
    /// Build a verifier from the shared access secret.
    ///
    /// # Errors
    /// Returns `ConfigurationError::MissingSecret` if the secret is empty.
    pub fn new(secret: &SecretString) -> Result<Self, ConfigurationError> {
        let secret = secret.expose_secret();
        if secret.is_empty() {
            return Err(ConfigurationError::MissingSecret("access secret"));
        }

        // exp and nbf are checked against the caller's clock below, not the system clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims.clear();

        Ok(Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Check `token` at instant `now` (Unix seconds). Pure: the same inputs
    /// always give the same outcome.
    #[instrument(skip_all)]
    pub fn verify(&self, token: &str, now: i64) -> Outcome {
        let data = match decode::<Map<String, Value>>(token, &self.key, &self.validation) {
            Ok(data) => data,
            Err(err) => {
                debug!("access token rejected: {err}");
                return Outcome::Invalid(err.into());
            }
        };

        let claims = AccessClaims::from(data.claims);
        if claims.nbf().is_some_and(|nbf| now < nbf) {
            debug!("access token not yet valid");
            return Outcome::Invalid(VerificationError::NotYetValid);
        }
        match claims.exp() {
            Some(exp) if now >= exp => Outcome::Expired { exp },
            _ => Outcome::Valid(claims),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "access-secret-for-tests";

    fn sign(payload: &Value, secret: &str) -> String {
        encode(
            &Header::default(),
            payload,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn verifier() -> AccessVerifier {
        AccessVerifier::new(&SecretString::from(SECRET)).unwrap()
    }

    #[test]
    fn empty_secret_is_a_configuration_error() {
        let result = AccessVerifier::new(&SecretString::from(""));
        assert!(matches!(
            result,
            Err(ConfigurationError::MissingSecret("access secret"))
        ));
    }

    #[test]
    fn valid_token_exposes_exp() {
        let token = sign(&json!({"id": 1, "username": "xenobas", "exp": 1025}), SECRET);
        match verifier().verify(&token, 1000) {
            Outcome::Valid(claims) => {
                assert_eq!(claims.exp(), Some(1025));
                assert_eq!(claims.username(), Some("xenobas"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn expired_token_carries_true_exp() {
        let token = sign(&json!({"exp": 990}), SECRET);
        assert_eq!(verifier().verify(&token, 1000), Outcome::Expired { exp: 990 });
    }

    #[test]
    fn token_expiring_now_is_expired() {
        let token = sign(&json!({"exp": 1000}), SECRET);
        assert_eq!(verifier().verify(&token, 1000), Outcome::Expired { exp: 1000 });
    }

    #[test]
    fn missing_exp_is_still_valid() {
        let token = sign(&json!({"id": 1}), SECRET);
        match verifier().verify(&token, 1000) {
            Outcome::Valid(claims) => assert_eq!(claims.exp(), None),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn non_numeric_exp_is_valid_without_exp() {
        let token = sign(&json!({"exp": "tomorrow"}), SECRET);
        match verifier().verify(&token, 1000) {
            Outcome::Valid(claims) => {
                assert_eq!(claims.exp(), None);
                assert_eq!(claims.get("exp"), Some(&json!("tomorrow")));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn future_nbf_is_invalid_until_reached() {
        let token = sign(&json!({"exp": 5000, "nbf": 4000}), SECRET);
        assert_eq!(
            verifier().verify(&token, 1000),
            Outcome::Invalid(VerificationError::NotYetValid)
        );
        assert!(verifier().verify(&token, 4000).is_valid());
    }

    #[test]
    fn wrong_secret_is_invalid_signature() {
        let token = sign(&json!({"exp": 1025}), "another-secret");
        assert_eq!(
            verifier().verify(&token, 1000),
            Outcome::Invalid(VerificationError::InvalidSignature)
        );
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            verifier().verify("not.a.jwt", 1000),
            Outcome::Invalid(VerificationError::Malformed(_))
        ));
        assert!(matches!(
            verifier().verify("", 1000),
            Outcome::Invalid(VerificationError::Malformed(_))
        ));
    }

    #[test]
    fn verify_is_idempotent() {
        let verifier = verifier();
        for token in [
            sign(&json!({"exp": 1025}), SECRET),
            sign(&json!({"exp": 10}), SECRET),
            sign(&json!({"exp": 1025}), "other"),
        ] {
            assert_eq!(verifier.verify(&token, 1000), verifier.verify(&token, 1000));
        }
    }

    #[test]
    fn debug_hides_key() {
        let rendered = format!("{:?}", verifier());
        assert!(rendered.contains("***"));
        assert!(!rendered.contains(SECRET));
    }
}
