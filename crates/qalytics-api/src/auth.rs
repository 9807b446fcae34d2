//! Password hashing, bearer tokens, and the [`CurrentUser`] extractor.
//!
//! Tokens are `base64url(claims) "." hex(HMAC-SHA256(secret, claims))`, where
//! `claims` is the JSON `{"sub": <user id>, "exp": <unix seconds>}`.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{extract::FromRequestParts, http::request::Parts};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use qalytics_core::{Id, entity::User, store::MetricsStore};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::{AppState, error::ApiError};

type HmacSha256 = Hmac<Sha256>;

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Hash `password` into an argon2 PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| ApiError::Internal(format!("argon2 error: {e}")))
}

/// Check `password` against a stored PHC string. A malformed hash never
/// verifies.
pub fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .map(|parsed| {
      Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
    })
    .unwrap_or(false)
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct Claims {
  sub: Id,
  exp: i64,
}

/// Signing key and lifetime for bearer tokens.
#[derive(Clone)]
pub struct TokenKeys {
  mac: HmacSha256,
  ttl: Duration,
}

/// Why a [`TokenKeys`] could not be built.
#[derive(Debug, Error)]
pub enum KeyError {
  #[error("token secret has an invalid length")]
  Secret,

  #[error("token lifetime of {0} hours is out of range")]
  Ttl(i64),
}

impl TokenKeys {
  pub fn new(secret: &[u8], ttl_hours: i64) -> Result<Self, KeyError> {
    let ttl = Duration::try_hours(ttl_hours)
      .filter(|ttl| *ttl > Duration::zero())
      .ok_or(KeyError::Ttl(ttl_hours))?;
    Ok(Self {
      mac: HmacSha256::new_from_slice(secret).map_err(|_| KeyError::Secret)?,
      ttl,
    })
  }

  fn sign(&self, payload: &str) -> String {
    let mut mac = self.mac.clone();
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
  }

  pub fn issue(&self, user_id: Id) -> Result<String, ApiError> {
    self.issue_at(user_id, Utc::now())
  }

  pub fn issue_at(&self, user_id: Id, now: DateTime<Utc>) -> Result<String, ApiError> {
    let exp = now
      .checked_add_signed(self.ttl)
      .ok_or_else(|| ApiError::Internal("token expiry out of range".to_owned()))?;
    let claims = Claims { sub: user_id, exp: exp.timestamp() };
    let json = serde_json::to_vec(&claims)
      .map_err(|e| ApiError::Internal(e.to_string()))?;
    let payload = URL_SAFE_NO_PAD.encode(json);
    let signature = self.sign(&payload);
    Ok(format!("{payload}.{signature}"))
  }

  /// The user id a token was issued for, if it is well formed, correctly
  /// signed, and not expired.
  pub fn verify(&self, token: &str) -> Option<Id> {
    self.verify_at(token, Utc::now())
  }

  pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Option<Id> {
    let (payload, signature) = token.split_once('.')?;
    let signature = hex::decode(signature).ok()?;

    let mut mac = self.mac.clone();
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature).ok()?;

    let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: Claims = serde_json::from_slice(&json).ok()?;
    (claims.exp > now.timestamp()).then_some(claims.sub)
  }
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The authenticated user behind a `Authorization: Bearer` header. Handlers
/// that take this are rejected with 401 when it cannot be resolved.
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<AppState<S>> for CurrentUser
where
  S: MetricsStore + Clone + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = parts
      .headers
      .get(axum::http::header::AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.strip_prefix("Bearer "))
      .ok_or(ApiError::Unauthorized)?;

    let user_id = state.tokens.verify(token).ok_or(ApiError::Unauthorized)?;

    let user = state
      .store
      .get_user(user_id)
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::Unauthorized)?;
    Ok(CurrentUser(user))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn keys() -> TokenKeys { TokenKeys::new(b"test-secret", 24).unwrap() }

  #[test]
  fn token_roundtrip() {
    let keys = keys();
    let token = keys.issue(7).unwrap();
    assert_eq!(keys.verify(&token), Some(7));
  }

  #[test]
  fn expired_token_is_rejected() {
    let keys = keys();
    let issued = Utc::now() - Duration::hours(25);
    let token = keys.issue_at(7, issued).unwrap();
    assert_eq!(keys.verify(&token), None);
  }

  #[test]
  fn tampered_payload_is_rejected() {
    let keys = keys();
    let token = keys.issue(7).unwrap();
    let (_, signature) = token.split_once('.').unwrap();
    let forged_claims = URL_SAFE_NO_PAD.encode(br#"{"sub":1,"exp":99999999999}"#);
    assert_eq!(keys.verify(&format!("{forged_claims}.{signature}")), None);
  }

  #[test]
  fn other_secret_is_rejected() {
    let token = keys().issue(7).unwrap();
    let other = TokenKeys::new(b"another-secret", 24).unwrap();
    assert_eq!(other.verify(&token), None);
  }

  #[test]
  fn out_of_range_lifetime_is_rejected() {
    for ttl in [0, -1, i64::MAX] {
      assert!(matches!(
        TokenKeys::new(b"test-secret", ttl),
        Err(KeyError::Ttl(t)) if t == ttl
      ));
    }
  }

  #[test]
  fn expiry_past_the_calendar_is_an_error() {
    let keys = TokenKeys::new(b"test-secret", 2_000_000_000_000).unwrap();
    assert!(matches!(keys.issue(7), Err(ApiError::Internal(_))));
  }

  #[test]
  fn garbage_is_rejected() {
    let keys = keys();
    assert_eq!(keys.verify(""), None);
    assert_eq!(keys.verify("no-dot"), None);
    assert_eq!(keys.verify("abc.zz"), None);
  }

  #[test]
  fn password_hash_verifies() {
    let hash = hash_password("hunter2").unwrap();
    assert!(verify_password("hunter2", &hash));
    assert!(!verify_password("hunter3", &hash));
    assert!(!verify_password("hunter2", "not-a-phc-string"));
  }
}
