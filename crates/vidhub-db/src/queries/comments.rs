use anyhow::Result;
use chrono::Utc;
use rusqlite::{Row, TransactionBehavior};
use uuid::Uuid;

use vidhub_types::models::Comment;
use vidhub_types::pagination::PageRequest;

use super::likes::delete_likes_where;
use super::{OptionalExt, uuid_at};
use crate::Database;
use crate::models::LikeKind;

const COMMENT_COLUMNS: &str = "id, video_id, owner, content, created_at, updated_at";

impl Database {
    // -- Comments --

    pub fn insert_comment(&self, video: Uuid, owner: Uuid, content: &str) -> Result<Comment> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, video_id, owner, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                rusqlite::params![id.to_string(), video.to_string(), owner.to_string(), content, now],
            )?;
            Ok(())
        })?;

        Ok(Comment {
            id,
            video,
            owner,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM comments WHERE id = ?1", COMMENT_COLUMNS);
            conn.query_row(&sql, [id.to_string()], map_comment).optional()
        })
    }

    pub fn comment_exists(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM comments WHERE id = ?1)",
                [id.to_string()],
                |r| r.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Comments on a video, newest first, cut to one window.
    pub fn list_comments(&self, video: Uuid, page: PageRequest) -> Result<(Vec<Comment>, u64)> {
        let video = video.to_string();
        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM comments WHERE video_id = ?1",
                [&video],
                |row| row.get(0),
            )?;

            let sql = format!(
                "SELECT {} FROM comments WHERE video_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT {} OFFSET {}",
                COMMENT_COLUMNS,
                page.limit(),
                page.offset()
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([&video], map_comment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok((rows, total as u64))
        })
    }

    pub fn update_comment(&self, id: Uuid, content: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE comments SET content = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![id.to_string(), content, Utc::now()],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn delete_comment(&self, id: Uuid) -> Result<bool> {
        let id = id.to_string();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            delete_likes_where(&tx, LikeKind::Comment, "SELECT ?2", &id)?;
            let removed = tx.execute("DELETE FROM comments WHERE id = ?1", [&id])?;
            tx.commit()?;
            Ok(removed == 1)
        })
    }
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: uuid_at(row, 0)?,
        video: uuid_at(row, 1)?,
        owner: uuid_at(row, 2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ToggleTarget;
    use crate::queries::fixtures;

    #[test]
    fn list_is_windowed_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let alice = fixtures::user(&db, "alice");
        let v = fixtures::video(&db, alice, "clip");
        let other = fixtures::video(&db, alice, "other");

        for i in 0..5 {
            db.insert_comment(v, alice, &format!("c{}", i)).unwrap();
        }
        db.insert_comment(other, alice, "elsewhere").unwrap();

        let (rows, total) = db.list_comments(v, PageRequest::new(1, 2)).unwrap();
        assert_eq!(total, 5);
        let contents: Vec<_> = rows.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["c4", "c3"]);
    }

    #[test]
    fn update_and_delete() {
        let db = Database::open_in_memory().unwrap();
        let alice = fixtures::user(&db, "alice");
        let v = fixtures::video(&db, alice, "clip");
        let c = db.insert_comment(v, alice, "frist").unwrap();

        assert!(db.update_comment(c.id, "first").unwrap());
        assert_eq!(db.get_comment(c.id).unwrap().unwrap().content, "first");

        db.toggle(ToggleTarget::Comment(c.id), alice).unwrap();
        assert!(db.delete_comment(c.id).unwrap());
        assert!(!db.comment_exists(c.id).unwrap());
        assert!(db.like_members(LikeKind::Comment, c.id).unwrap().is_empty());
    }
}
