//! Refresh-token sessions: issue a token pair, rotate it, revoke it.
//!
//! Only the SHA-256 fingerprint of a refresh token is ever stored. Rotation is
//! a single compare-and-swap on that fingerprint, so a refresh token can be
//! exchanged at most once; presenting it again is rejected without touching
//! the stored session.

use tracing::{debug, info, warn};
use uuid::Uuid;

use vidhub_auth::TokenService;
use vidhub_auth::keys::fingerprint;
use vidhub_db::Database;
use vidhub_db::models::{Eviction, NewSession};

use crate::error::ApiError;

/// How many live sessions a principal may hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionPolicy {
    /// One session per principal; logging in elsewhere ends the previous one.
    #[default]
    Single,
    /// One session per device tag.
    PerDevice,
}

impl SessionPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "single" => Some(Self::Single),
            "per-device" | "per_device" => Some(Self::PerDevice),
            _ => None,
        }
    }

    fn eviction(self) -> Eviction {
        match self {
            Self::Single => Eviction::AllForUser,
            Self::PerDevice => Eviction::SameDevice,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct SessionService<'a> {
    db: &'a Database,
    tokens: &'a TokenService,
    policy: SessionPolicy,
}

impl<'a> SessionService<'a> {
    pub fn new(db: &'a Database, tokens: &'a TokenService, policy: SessionPolicy) -> Self {
        Self { db, tokens, policy }
    }

    /// Mint a fresh pair and record the refresh token as a live session,
    /// evicting whatever the policy says it replaces.
    pub fn issue(&self, principal: Uuid, device: Option<&str>) -> Result<TokenPair, ApiError> {
        let access = self.tokens.issue_access(principal)?;
        let refresh = self.tokens.issue_refresh(principal)?;

        let device = match self.policy {
            SessionPolicy::Single => None,
            SessionPolicy::PerDevice => device.map(str::trim).filter(|d| !d.is_empty()),
        };

        let token_hash = fingerprint(&refresh.token);
        self.db.create_session(
            &NewSession {
                user_id: principal,
                token_hash: &token_hash,
                device,
                issued_at: refresh.issued_at(),
                expires_at: refresh.expires_at(),
            },
            self.policy.eviction(),
        )?;

        debug!(user_id = %principal, ?device, "Session issued");
        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
        })
    }

    /// Exchange a refresh token for a new pair.
    ///
    /// Bad signature or expiry is `Unauthorized`; a principal that no longer
    /// exists is `NotFound`; a token that is no longer the live session
    /// (rotated, revoked, or evicted) is `Forbidden` and changes nothing.
    pub fn rotate(&self, presented: &str) -> Result<TokenPair, ApiError> {
        let claims = self.tokens.verify_refresh(presented)?;

        if self.db.get_user_by_id(claims.sub)?.is_none() {
            return Err(ApiError::NotFound("User not found".into()));
        }

        let access = self.tokens.issue_access(claims.sub)?;
        let refresh = self.tokens.issue_refresh(claims.sub)?;
        let next_hash = fingerprint(&refresh.token);

        let swapped = self.db.rotate_session(
            &fingerprint(presented),
            &NewSession {
                user_id: claims.sub,
                token_hash: &next_hash,
                device: None,
                issued_at: refresh.issued_at(),
                expires_at: refresh.expires_at(),
            },
        )?;

        if !swapped {
            warn!(user_id = %claims.sub, "Refresh token rejected: session revoked or already rotated");
            return Err(ApiError::Forbidden("Refresh token is expired or already used".into()));
        }

        debug!(user_id = %claims.sub, "Session rotated");
        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
        })
    }

    /// End every session of the principal. Safe to call repeatedly.
    pub fn revoke(&self, principal: Uuid) -> Result<usize, ApiError> {
        let removed = self.db.delete_sessions_for_user(principal)?;
        info!(user_id = %principal, removed, "Sessions revoked");
        Ok(removed)
    }

    /// End only the session the presented refresh token belongs to.
    pub fn revoke_current(&self, principal: Uuid, presented: &str) -> Result<bool, ApiError> {
        let removed = self.db.delete_session(principal, &fingerprint(presented))?;
        info!(user_id = %principal, removed, "Session revoked");
        Ok(removed)
    }
}
