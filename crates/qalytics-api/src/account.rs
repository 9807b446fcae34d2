//! Handlers for `/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/signup` | Body: `{"email", "password", "role"?}`; 400 if taken |
//! | `POST` | `/auth/login`  | Body: `{"email", "password"}`; 400 on bad credentials |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use qalytics_core::{
  entity::{DEFAULT_ROLE, NewUser, User},
  store::MetricsStore,
};
use serde::{Deserialize, Serialize};

use crate::{
  AppState,
  auth::{hash_password, verify_password},
  error::ApiError,
};

// ─── Signup ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SignupBody {
  pub email:    String,
  pub password: String,
  pub role:     Option<String>,
}

/// `POST /auth/signup`
pub async fn signup<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<SignupBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MetricsStore + Clone + 'static,
{
  let email = body.email.trim().to_lowercase();
  if !looks_like_email(&email) {
    return Err(ApiError::BadRequest("invalid email address".to_owned()));
  }
  if body.password.is_empty() {
    return Err(ApiError::BadRequest("password must not be empty".to_owned()));
  }

  let user = state
    .store
    .create_user(NewUser {
      email,
      password_hash: hash_password(&body.password)?,
      role:          body.role.unwrap_or_else(|| DEFAULT_ROLE.to_owned()),
    })
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(user)))
}

fn looks_like_email(s: &str) -> bool {
  match s.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
    }
    None => false,
  }
}

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
  pub access_token: String,
  pub token_type:   &'static str,
  pub user:         User,
}

/// `POST /auth/login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<Json<TokenResponse>, ApiError>
where
  S: MetricsStore + Clone + 'static,
{
  let email = body.email.trim().to_lowercase();
  let credentials = state
    .store
    .find_credentials(&email)
    .await
    .map_err(ApiError::store)?;

  let Some(credentials) = credentials
    .filter(|c| verify_password(&body.password, &c.password_hash))
  else {
    tracing::warn!(%email, "failed login");
    return Err(ApiError::BadRequest("Invalid credentials".to_owned()));
  };

  let access_token = state.tokens.issue(credentials.user.id)?;
  Ok(Json(TokenResponse {
    access_token,
    token_type: "bearer",
    user: credentials.user,
  }))
}

#[cfg(test)]
mod tests {
  use super::looks_like_email;

  #[test]
  fn email_shape() {
    assert!(looks_like_email("qa@example.com"));
    assert!(!looks_like_email("qa.example.com"));
    assert!(!looks_like_email("@example.com"));
    assert!(!looks_like_email("qa@localhost"));
  }
}
