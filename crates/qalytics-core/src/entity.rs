//! The PnL hierarchy and the users who edit it.
//!
//! A PnL owns Sub-PnLs; metrics live in their own rows (see
//! [`crate::metrics`]) so the envelopes here only carry identity and naming.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Id;

// ─── Users ───────────────────────────────────────────────────────────────────

/// An account that can sign in and author metrics changes.
///
/// The password hash is held separately in [`UserCredentials`] so a `User` is
/// always safe to serialise into a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:         Id,
  pub email:      String,
  pub role:       String,
  pub created_at: DateTime<Utc>,
}

/// A user bundled with their argon2 PHC hash, as needed by login.
#[derive(Debug, Clone)]
pub struct UserCredentials {
  pub user:          User,
  pub password_hash: String,
}

/// Input to [`crate::store::MetricsStore::create_user`]. The password must
/// already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub email:         String,
  pub password_hash: String,
  pub role:          String,
}

/// Role assigned when signup does not name one.
pub const DEFAULT_ROLE: &str = "user";

// ─── PnLs ────────────────────────────────────────────────────────────────────

/// A top-level business or product line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pnl {
  pub id:          Id,
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// A sub-unit of a PnL; the level metrics are authored against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubPnl {
  pub id:          Id,
  pub pnl_id:      Id,
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Name and description for a new PnL or Sub-PnL.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUnit {
  pub name:        String,
  pub description: Option<String>,
}

/// A partial rename/redescribe of a PnL or Sub-PnL. Absent fields are kept.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnitChanges {
  pub name:        Option<String>,
  pub description: Option<String>,
}
