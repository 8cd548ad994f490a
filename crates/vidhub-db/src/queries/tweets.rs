use anyhow::Result;
use chrono::Utc;
use rusqlite::{Row, TransactionBehavior};
use uuid::Uuid;

use vidhub_types::models::Tweet;

use super::likes::delete_likes_where;
use super::{OptionalExt, uuid_at};
use crate::Database;
use crate::models::LikeKind;

const TWEET_COLUMNS: &str = "id, owner, content, created_at, updated_at";

impl Database {
    // -- Tweets --

    pub fn insert_tweet(&self, owner: Uuid, content: &str) -> Result<Tweet> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tweets (id, owner, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                rusqlite::params![id.to_string(), owner.to_string(), content, now],
            )?;
            Ok(())
        })?;

        Ok(Tweet {
            id,
            owner,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_tweet(&self, id: Uuid) -> Result<Option<Tweet>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM tweets WHERE id = ?1", TWEET_COLUMNS);
            conn.query_row(&sql, [id.to_string()], map_tweet).optional()
        })
    }

    pub fn tweet_exists(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM tweets WHERE id = ?1)",
                [id.to_string()],
                |r| r.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Tweets by `owner`, newest first.
    pub fn list_tweets_by_owner(&self, owner: Uuid) -> Result<Vec<Tweet>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM tweets WHERE owner = ?1 ORDER BY created_at DESC, rowid DESC",
                TWEET_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([owner.to_string()], map_tweet)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_tweet(&self, id: Uuid, content: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE tweets SET content = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![id.to_string(), content, Utc::now()],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn delete_tweet(&self, id: Uuid) -> Result<bool> {
        let id = id.to_string();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            delete_likes_where(&tx, LikeKind::Tweet, "SELECT ?2", &id)?;
            let removed = tx.execute("DELETE FROM tweets WHERE id = ?1", [&id])?;
            tx.commit()?;
            Ok(removed == 1)
        })
    }
}

fn map_tweet(row: &Row<'_>) -> rusqlite::Result<Tweet> {
    Ok(Tweet {
        id: uuid_at(row, 0)?,
        owner: uuid_at(row, 1)?,
        content: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ToggleTarget;
    use crate::queries::fixtures;

    #[test]
    fn newest_first_per_owner() {
        let db = Database::open_in_memory().unwrap();
        let alice = fixtures::user(&db, "alice");
        let bob = fixtures::user(&db, "bob");

        db.insert_tweet(alice, "hello").unwrap();
        db.insert_tweet(bob, "hi").unwrap();
        db.insert_tweet(alice, "again").unwrap();

        let contents: Vec<_> = db
            .list_tweets_by_owner(alice)
            .unwrap()
            .into_iter()
            .map(|t| t.content)
            .collect();
        assert_eq!(contents, vec!["again", "hello"]);
    }

    #[test]
    fn delete_drops_likes() {
        let db = Database::open_in_memory().unwrap();
        let alice = fixtures::user(&db, "alice");
        let bob = fixtures::user(&db, "bob");
        let t = db.insert_tweet(alice, "hello").unwrap();

        db.toggle(ToggleTarget::Tweet(t.id), bob).unwrap();
        assert_eq!(db.like_count(LikeKind::Tweet, t.id).unwrap(), 1);

        assert!(db.update_tweet(t.id, "hello world").unwrap());
        assert!(db.delete_tweet(t.id).unwrap());
        assert!(!db.tweet_exists(t.id).unwrap());
        assert_eq!(db.like_count(LikeKind::Tweet, t.id).unwrap(), 0);
    }
}
