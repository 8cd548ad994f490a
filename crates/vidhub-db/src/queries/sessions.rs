use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Row, TransactionBehavior};
use uuid::Uuid;

use super::{OptionalExt, uuid_at};
use crate::Database;
use crate::models::{Eviction, NewSession, SessionRow};

const SESSION_COLUMNS: &str = "id, user_id, token_hash, device, issued_at, expires_at";

impl Database {
    // -- Sessions --

    /// Record a freshly issued refresh token, evicting the sessions it replaces,
    /// in one transaction.
    pub fn create_session(&self, session: &NewSession<'_>, eviction: Eviction) -> Result<SessionRow> {
        let id = Uuid::new_v4();
        let user_id = session.user_id.to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            match eviction {
                Eviction::AllForUser => {
                    tx.execute("DELETE FROM sessions WHERE user_id = ?1", [&user_id])?;
                }
                Eviction::SameDevice => {
                    tx.execute(
                        "DELETE FROM sessions WHERE user_id = ?1 AND device IS ?2",
                        rusqlite::params![&user_id, session.device],
                    )?;
                }
            }

            tx.execute(
                "INSERT INTO sessions (id, user_id, token_hash, device, issued_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    id.to_string(),
                    &user_id,
                    session.token_hash,
                    session.device,
                    session.issued_at,
                    session.expires_at,
                ],
            )?;

            tx.commit()?;
            Ok(())
        })?;

        Ok(SessionRow {
            id,
            user_id: session.user_id,
            token_hash: session.token_hash.to_string(),
            device: session.device.map(str::to_string),
            issued_at: session.issued_at,
            expires_at: session.expires_at,
        })
    }

    /// Compare-and-swap: replace `presented_hash` with `next.token_hash` only if
    /// `presented_hash` is still the live, unexpired session of `next.user_id`.
    ///
    /// Returns `false` (and changes nothing) when the presented token was
    /// already rotated away, revoked, or expired.
    pub fn rotate_session(&self, presented_hash: &str, next: &NewSession<'_>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE sessions
                 SET token_hash = ?3, issued_at = ?4, expires_at = ?5
                 WHERE user_id = ?1 AND token_hash = ?2 AND expires_at > ?4",
                rusqlite::params![
                    next.user_id.to_string(),
                    presented_hash,
                    next.token_hash,
                    next.issued_at,
                    next.expires_at,
                ],
            )?;
            Ok(changed == 1)
        })
    }

    /// Drop every session of a principal. Returns how many were removed.
    pub fn delete_sessions_for_user(&self, user_id: Uuid) -> Result<usize> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM sessions WHERE user_id = ?1", [user_id.to_string()])?;
            Ok(removed)
        })
    }

    pub fn delete_session(&self, user_id: Uuid, token_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM sessions WHERE user_id = ?1 AND token_hash = ?2",
                (user_id.to_string(), token_hash),
            )?;
            Ok(removed == 1)
        })
    }

    pub fn get_session_by_hash(&self, token_hash: &str) -> Result<Option<SessionRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM sessions WHERE token_hash = ?1", SESSION_COLUMNS);
            conn.query_row(&sql, [token_hash], map_session).optional()
        })
    }

    pub fn get_sessions_for_user(&self, user_id: Uuid) -> Result<Vec<SessionRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM sessions WHERE user_id = ?1 ORDER BY issued_at DESC",
                SESSION_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id.to_string()], map_session)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", [now])?;
            Ok(removed)
        })
    }
}

fn map_session(row: &Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok(SessionRow {
        id: uuid_at(row, 0)?,
        user_id: uuid_at(row, 1)?,
        token_hash: row.get(2)?,
        device: row.get(3)?,
        issued_at: row.get(4)?,
        expires_at: row.get(5)?,
    })
}
