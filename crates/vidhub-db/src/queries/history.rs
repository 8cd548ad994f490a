use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

use super::uuid_at;
use crate::Database;

impl Database {
    // -- Watch history --

    /// Record that `user` watched `video`. One entry per video: watching it
    /// again moves it back to the front.
    pub fn record_watch(&self, user: Uuid, video: Uuid) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO watch_history (user_id, video_id, position, watched_at)
                 VALUES (?1, ?2,
                         (SELECT COALESCE(MAX(position), 0) + 1 FROM watch_history WHERE user_id = ?1),
                         ?3)
                 ON CONFLICT(user_id, video_id) DO UPDATE
                 SET position = excluded.position, watched_at = excluded.watched_at",
                rusqlite::params![user.to_string(), video.to_string(), Utc::now()],
            )?;
            Ok(())
        })
    }

    /// Video ids in `user`'s history, most recent first.
    pub fn watch_history_ids(&self, user: Uuid) -> Result<Vec<Uuid>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT video_id FROM watch_history WHERE user_id = ?1 ORDER BY position DESC",
            )?;
            let ids = stmt
                .query_map([user.to_string()], |row| uuid_at(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    pub fn clear_watch_history(&self, user: Uuid) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM watch_history WHERE user_id = ?1", [user.to_string()])?)
        })
    }
}
