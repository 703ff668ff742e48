//! Bearer token signing and verification (Ed25519).
//!
//! Tokens carry the subject id in the standard `sub` claim and a role hint in
//! the custom claims. The hint is informational only: the role gate re-reads
//! the subject's role from the store on every request.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::SigningKey;
use jwt_simple::prelude::*;
use rand::rngs::OsRng;

use crate::error::{AppError, Result};
use crate::models::Role;

const TOKEN_ISSUER: &str = "keygate";

/// Custom claims carried alongside the standard set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Role hint; never trusted without a store lookup
    pub role: String,
}

/// Subject data extracted from a token that passed signature and expiry
/// verification.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub subject_id: String,
    pub role_hint: Option<Role>,
}

/// Generate a new Ed25519 key pair.
/// Returns (private_key_base64, public_key_base64), 32 bytes each.
pub fn generate_keypair() -> (String, String) {
    let signing_key = SigningKey::generate(&mut OsRng);
    let verifying_key = signing_key.verifying_key();

    (
        BASE64.encode(signing_key.to_bytes()),
        BASE64.encode(verifying_key.to_bytes()),
    )
}

fn decode_key_bytes(encoded: &str) -> Result<[u8; 32]> {
    let decoded = BASE64
        .decode(encoded.trim())
        .map_err(|e| AppError::Internal(format!("Invalid key encoding: {}", e)))?;

    decoded
        .as_slice()
        .try_into()
        .map_err(|_| AppError::Internal(format!("Key must be 32 bytes, got {}", decoded.len())))
}

/// Signs subject tokens. Used by the dev token endpoint and by tests; in
/// production tokens are minted by the identity collaborator.
pub struct TokenSigner {
    key_pair: Ed25519KeyPair,
}

impl TokenSigner {
    pub fn from_base64(private_key_b64: &str) -> Result<Self> {
        let seed = decode_key_bytes(private_key_b64)?;
        let signing_key = SigningKey::from_bytes(&seed);
        let key_pair = Ed25519KeyPair::from_bytes(&signing_key.to_keypair_bytes())
            .map_err(|e| AppError::Internal(format!("Failed to build key pair: {}", e)))?;
        Ok(Self { key_pair })
    }

    pub fn sign(&self, subject_id: &str, role: Role, ttl_secs: u64) -> Result<String> {
        let custom = AccessClaims {
            role: role.as_str().to_string(),
        };
        let claims = Claims::with_custom_claims(custom, Duration::from_secs(ttl_secs))
            .with_issuer(TOKEN_ISSUER)
            .with_subject(subject_id);

        self.key_pair
            .sign(claims)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Sign a token with an absolute expiry instant (unix seconds). Lets
    /// callers mint already-expired tokens when exercising the verifier.
    pub fn sign_expiring_at(&self, subject_id: &str, role: Role, expires_at: i64) -> Result<String> {
        let custom = AccessClaims {
            role: role.as_str().to_string(),
        };
        let mut claims = Claims::with_custom_claims(custom, Duration::from_secs(1))
            .with_issuer(TOKEN_ISSUER)
            .with_subject(subject_id);
        claims.expires_at = Some(UnixTimeStamp::from_secs(expires_at.max(0) as u64));

        self.key_pair
            .sign(claims)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }
}

/// Verifies bearer tokens against the configured public key.
///
/// An unconfigured verifier fails closed: every token is rejected.
#[derive(Clone)]
pub struct TokenVerifier {
    public_key_b64: Option<String>,
}

impl TokenVerifier {
    pub fn new(public_key_b64: Option<String>) -> Self {
        Self { public_key_b64 }
    }

    /// Check signature and expiry, returning the subject. Any failure maps
    /// to 401; callers never learn which check failed.
    pub fn verify(&self, token: &str) -> Result<VerifiedToken> {
        fn invalid() -> AppError {
            AppError::Unauthorized("invalid or expired token")
        }

        let Some(ref public_key_b64) = self.public_key_b64 else {
            tracing::warn!("Token verification attempted without a configured public key");
            return Err(invalid());
        };

        let key_bytes = decode_key_bytes(public_key_b64)?;
        let public_key = Ed25519PublicKey::from_bytes(&key_bytes)
            .map_err(|e| AppError::Internal(format!("Invalid public key: {}", e)))?;

        let options = VerificationOptions {
            time_tolerance: Some(Duration::from_secs(0)),
            ..Default::default()
        };

        let claims = public_key
            .verify_token::<AccessClaims>(token, Some(options))
            .map_err(|_| invalid())?;

        let subject_id = claims.subject.ok_or_else(invalid)?;
        let role_hint = Role::parse(&claims.custom.role);

        Ok(VerifiedToken {
            subject_id,
            role_hint,
        })
    }
}
