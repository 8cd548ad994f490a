use std::collections::HashMap;

use anyhow::Result;
use rusqlite::Connection;
use uuid::Uuid;

use super::{id_params, placeholders, uuid_at};
use crate::Database;
use crate::models::LikeKind;

impl Database {
    // -- Likes (reads; writes go through `toggle`) --

    /// Members of the like document for a target, oldest like first.
    pub fn like_members(&self, kind: LikeKind, target: Uuid) -> Result<Vec<Uuid>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.user_id FROM like_members m
                 JOIN likes l ON l.id = m.like_id
                 WHERE l.target_kind = ?1 AND l.target_id = ?2
                 ORDER BY m.created_at, m.rowid",
            )?;
            let ids = stmt
                .query_map((kind.as_str(), target.to_string()), |row| uuid_at(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    /// Targets of kind video liked by `user`, most recently liked first.
    pub fn liked_video_ids(&self, user: Uuid) -> Result<Vec<Uuid>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT l.target_id FROM likes l
                 JOIN like_members m ON m.like_id = l.id
                 WHERE m.user_id = ?1 AND l.target_kind = 'video'
                 ORDER BY m.created_at DESC, m.rowid DESC",
            )?;
            let ids = stmt
                .query_map([user.to_string()], |row| uuid_at(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    pub fn is_liked(&self, kind: LikeKind, target: Uuid, user: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let liked = conn.query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM like_members m JOIN likes l ON l.id = m.like_id
                    WHERE l.target_kind = ?1 AND l.target_id = ?2 AND m.user_id = ?3)",
                (kind.as_str(), target.to_string(), user.to_string()),
                |row| row.get(0),
            )?;
            Ok(liked)
        })
    }

    /// Like counts for a batch of targets. Targets nobody liked are absent.
    pub fn like_counts(&self, kind: LikeKind, targets: &[Uuid]) -> Result<HashMap<Uuid, u64>> {
        if targets.is_empty() {
            return Ok(HashMap::new());
        }

        let mut params = vec![kind.as_str().to_string()];
        params.extend(targets.iter().map(Uuid::to_string));

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT l.target_id, COUNT(m.user_id) FROM likes l
                 JOIN like_members m ON m.like_id = l.id
                 WHERE l.target_kind = ?1 AND l.target_id IN ({})
                 GROUP BY l.target_id",
                placeholders(1, targets.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(id_params(&params).as_slice(), |row| {
                    Ok((uuid_at(row, 0)?, row.get::<_, i64>(1)? as u64))
                })?
                .collect::<std::result::Result<HashMap<_, _>, _>>()?;
            Ok(rows)
        })
    }

    pub fn like_count(&self, kind: LikeKind, target: Uuid) -> Result<u64> {
        Ok(self.like_counts(kind, &[target])?.get(&target).copied().unwrap_or(0))
    }

    /// Likes received across every video owned by `owner`.
    pub fn count_likes_on_owner_videos(&self, owner: Uuid) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM like_members m
                 JOIN likes l ON l.id = m.like_id
                 JOIN videos v ON v.id = l.target_id
                 WHERE l.target_kind = 'video' AND v.owner = ?1",
                [owner.to_string()],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }
}

/// Remove like documents (and through the cascade, their members) for targets
/// that are being deleted. `subquery` selects the target ids.
pub(crate) fn delete_likes_where(
    conn: &Connection,
    kind: LikeKind,
    subquery: &str,
    param: &str,
) -> Result<usize> {
    let sql = format!(
        "DELETE FROM likes WHERE target_kind = ?1 AND target_id IN ({})",
        subquery
    );
    Ok(conn.execute(&sql, (kind.as_str(), param))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ToggleTarget;
    use crate::queries::fixtures;

    #[test]
    fn liked_videos_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let alice = fixtures::user(&db, "alice");
        let v1 = fixtures::video(&db, alice, "one");
        let v2 = fixtures::video(&db, alice, "two");

        db.toggle(ToggleTarget::Video(v1), alice).unwrap();
        db.toggle(ToggleTarget::Video(v2), alice).unwrap();
        // comment likes never show up in the video list
        let comment = db.insert_comment(v1, alice, "nice").unwrap();
        db.toggle(ToggleTarget::Comment(comment.id), alice).unwrap();

        assert_eq!(db.liked_video_ids(alice).unwrap(), vec![v2, v1]);
    }

    #[test]
    fn counts_and_flags() {
        let db = Database::open_in_memory().unwrap();
        let alice = fixtures::user(&db, "alice");
        let bob = fixtures::user(&db, "bob");
        let v1 = fixtures::video(&db, alice, "one");
        let v2 = fixtures::video(&db, alice, "two");

        db.toggle(ToggleTarget::Video(v1), alice).unwrap();
        db.toggle(ToggleTarget::Video(v1), bob).unwrap();
        db.toggle(ToggleTarget::Video(v2), bob).unwrap();

        let counts = db.like_counts(LikeKind::Video, &[v1, v2]).unwrap();
        assert_eq!(counts[&v1], 2);
        assert_eq!(counts[&v2], 1);
        assert_eq!(db.like_count(LikeKind::Video, Uuid::new_v4()).unwrap(), 0);

        assert!(db.is_liked(LikeKind::Video, v2, bob).unwrap());
        assert!(!db.is_liked(LikeKind::Video, v2, alice).unwrap());
        assert_eq!(db.count_likes_on_owner_videos(alice).unwrap(), 3);
        assert_eq!(db.count_likes_on_owner_videos(bob).unwrap(), 0);
    }
}
