//! Idempotent membership toggles for many-to-many relationships.
//!
//! Every step is a set primitive against the stored rows (`INSERT .. ON
//! CONFLICT DO NOTHING`, `DELETE`), never a write-back of a previously read
//! copy, and the whole toggle runs inside one `BEGIN IMMEDIATE` transaction.
//! Two principals toggling the same target at once therefore cannot lose each
//! other's change or create two like documents for one target, whether they
//! share this connection or come from another process on the same file.

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Transaction, TransactionBehavior};
use tracing::debug;
use uuid::Uuid;

use crate::Database;
use crate::models::{LikeKind, ToggleOutcome, ToggleTarget};

impl Database {
    /// Flip `principal`'s membership in the relationship keyed by `target`.
    ///
    /// Returns `None` without writing anything when the target does not exist.
    /// The existence check shares the transaction with the write, so a delete
    /// of the target can never land between them.
    pub fn toggle(&self, target: ToggleTarget, principal: Uuid) -> Result<Option<ToggleOutcome>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let (table, id) = match target {
                ToggleTarget::Video(id) => ("videos", id),
                ToggleTarget::Comment(id) => ("comments", id),
                ToggleTarget::Tweet(id) => ("tweets", id),
                ToggleTarget::Channel(id) => ("users", id),
            };
            if !row_exists(&tx, table, id)? {
                debug!("Toggle {:?} by {}: target missing", target, principal);
                return Ok(None);
            }

            let outcome = match target {
                ToggleTarget::Video(id) => toggle_like(&tx, LikeKind::Video, id, principal)?,
                ToggleTarget::Comment(id) => toggle_like(&tx, LikeKind::Comment, id, principal)?,
                ToggleTarget::Tweet(id) => toggle_like(&tx, LikeKind::Tweet, id, principal)?,
                ToggleTarget::Channel(channel) => toggle_subscription(&tx, channel, principal)?,
            };

            tx.commit()?;
            debug!("Toggle {:?} by {}: {:?}", target, principal, outcome);
            Ok(Some(outcome))
        })
    }
}

fn row_exists(tx: &Transaction<'_>, table: &str, id: Uuid) -> Result<bool> {
    Ok(tx.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)", table),
        [id.to_string()],
        |row| row.get(0),
    )?)
}

fn toggle_like(
    tx: &Transaction<'_>,
    kind: LikeKind,
    target: Uuid,
    principal: Uuid,
) -> Result<ToggleOutcome> {
    let now = Utc::now();
    let target = target.to_string();
    let principal = principal.to_string();

    // Upsert the like document for this target; a concurrent first toggle hits
    // the UNIQUE(target_kind, target_id) key and keeps the existing row.
    tx.execute(
        "INSERT INTO likes (id, target_kind, target_id, created_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(target_kind, target_id) DO NOTHING",
        rusqlite::params![Uuid::new_v4().to_string(), kind.as_str(), &target, now],
    )?;

    let like_id: String = tx.query_row(
        "SELECT id FROM likes WHERE target_kind = ?1 AND target_id = ?2",
        (kind.as_str(), &target),
        |row| row.get(0),
    )?;

    let removed = tx.execute(
        "DELETE FROM like_members WHERE like_id = ?1 AND user_id = ?2",
        (&like_id, &principal),
    )?;

    if removed == 1 {
        // Last member gone: the document goes with it.
        tx.execute(
            "DELETE FROM likes WHERE id = ?1
             AND NOT EXISTS (SELECT 1 FROM like_members WHERE like_id = ?1)",
            [&like_id],
        )?;
        return Ok(ToggleOutcome::Deactivated);
    }

    tx.execute(
        "INSERT INTO like_members (like_id, user_id, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(like_id, user_id) DO NOTHING",
        rusqlite::params![&like_id, &principal, now],
    )?;
    Ok(ToggleOutcome::Activated)
}

/// A subscription row has exactly one member, so "membership" is row existence.
fn toggle_subscription(tx: &Transaction<'_>, channel: Uuid, subscriber: Uuid) -> Result<ToggleOutcome> {
    let channel = channel.to_string();
    let subscriber = subscriber.to_string();

    let removed = tx.execute(
        "DELETE FROM subscriptions WHERE subscriber = ?1 AND channel = ?2",
        (&subscriber, &channel),
    )?;
    if removed == 1 {
        return Ok(ToggleOutcome::Deactivated);
    }

    tx.execute(
        "INSERT INTO subscriptions (id, subscriber, channel, created_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(subscriber, channel) DO NOTHING",
        rusqlite::params![Uuid::new_v4().to_string(), &subscriber, &channel, Utc::now()],
    )?;
    Ok(ToggleOutcome::Activated)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::queries::fixtures;

    fn like_doc_count(db: &Database, kind: LikeKind, target: Uuid) -> i64 {
        db.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM likes WHERE target_kind = ?1 AND target_id = ?2",
                (kind.as_str(), target.to_string()),
                |r| r.get(0),
            )?)
        })
        .unwrap()
    }

    #[test]
    fn toggle_twice_restores_membership() {
        let db = Database::open_in_memory().unwrap();
        let alice = fixtures::user(&db, "alice");
        let bob = fixtures::user(&db, "bob");
        let video = fixtures::video(&db, bob, "clip");

        db.toggle(ToggleTarget::Video(video), bob).unwrap();
        let before = db.like_members(LikeKind::Video, video).unwrap();

        assert_eq!(db.toggle(ToggleTarget::Video(video), alice).unwrap(), Some(ToggleOutcome::Activated));
        assert_eq!(db.toggle(ToggleTarget::Video(video), alice).unwrap(), Some(ToggleOutcome::Deactivated));

        assert_eq!(db.like_members(LikeKind::Video, video).unwrap(), before);
    }

    #[test]
    fn sole_liker_unliking_removes_the_document() {
        let db = Database::open_in_memory().unwrap();
        let alice = fixtures::user(&db, "alice");
        let video = fixtures::video(&db, alice, "clip");

        db.toggle(ToggleTarget::Video(video), alice).unwrap();
        assert_eq!(like_doc_count(&db, LikeKind::Video, video), 1);

        db.toggle(ToggleTarget::Video(video), alice).unwrap();
        assert_eq!(like_doc_count(&db, LikeKind::Video, video), 0);
    }

    #[test]
    fn other_members_keep_the_document_alive() {
        let db = Database::open_in_memory().unwrap();
        let alice = fixtures::user(&db, "alice");
        let bob = fixtures::user(&db, "bob");
        let tweet = db.insert_tweet(alice, "hello").unwrap().id;

        db.toggle(ToggleTarget::Tweet(tweet), alice).unwrap();
        db.toggle(ToggleTarget::Tweet(tweet), bob).unwrap();
        db.toggle(ToggleTarget::Tweet(tweet), alice).unwrap();

        assert_eq!(like_doc_count(&db, LikeKind::Tweet, tweet), 1);
        assert_eq!(db.like_members(LikeKind::Tweet, tweet).unwrap(), vec![bob]);
    }

    #[test]
    fn comment_and_tweet_likes_are_separate_documents() {
        let db = Database::open_in_memory().unwrap();
        let alice = fixtures::user(&db, "alice");
        let video = fixtures::video(&db, alice, "clip");
        let comment = db.insert_comment(video, alice, "first").unwrap().id;
        let tweet = db.insert_tweet(alice, "hello").unwrap().id;

        db.toggle(ToggleTarget::Comment(comment), alice).unwrap();
        db.toggle(ToggleTarget::Tweet(tweet), alice).unwrap();

        assert_eq!(like_doc_count(&db, LikeKind::Comment, comment), 1);
        assert_eq!(like_doc_count(&db, LikeKind::Tweet, tweet), 1);
        assert_eq!(like_doc_count(&db, LikeKind::Tweet, comment), 0);
    }

    #[test]
    fn missing_targets_are_left_untouched() {
        let db = Database::open_in_memory().unwrap();
        let alice = fixtures::user(&db, "alice");
        let ghost = Uuid::new_v4();

        assert_eq!(db.toggle(ToggleTarget::Video(ghost), alice).unwrap(), None);
        assert_eq!(db.toggle(ToggleTarget::Comment(ghost), alice).unwrap(), None);
        assert_eq!(db.toggle(ToggleTarget::Tweet(ghost), alice).unwrap(), None);
        assert_eq!(db.toggle(ToggleTarget::Channel(ghost), alice).unwrap(), None);

        assert_eq!(like_doc_count(&db, LikeKind::Video, ghost), 0);
        assert_eq!(like_doc_count(&db, LikeKind::Comment, ghost), 0);
        assert_eq!(like_doc_count(&db, LikeKind::Tweet, ghost), 0);
        assert_eq!(db.count_subscribed_to(alice).unwrap(), 0);
    }

    #[test]
    fn liking_a_deleted_video_leaves_no_document() {
        let db = Database::open_in_memory().unwrap();
        let alice = fixtures::user(&db, "alice");
        let video = fixtures::video(&db, alice, "gone soon");

        assert!(db.video_exists(video).unwrap());
        assert!(db.delete_video(video).unwrap());

        assert_eq!(db.toggle(ToggleTarget::Video(video), alice).unwrap(), None);
        assert_eq!(like_doc_count(&db, LikeKind::Video, video), 0);
        assert!(db.like_members(LikeKind::Video, video).unwrap().is_empty());
    }

    #[test]
    fn subscription_toggle_creates_and_deletes_row() {
        let db = Database::open_in_memory().unwrap();
        let alice = fixtures::user(&db, "alice");
        let chan = fixtures::user(&db, "chan");

        assert_eq!(db.toggle(ToggleTarget::Channel(chan), alice).unwrap(), Some(ToggleOutcome::Activated));
        assert!(db.is_subscribed(alice, chan).unwrap());
        assert_eq!(db.count_subscribers(chan).unwrap(), 1);

        assert_eq!(db.toggle(ToggleTarget::Channel(chan), alice).unwrap(), Some(ToggleOutcome::Deactivated));
        assert!(!db.is_subscribed(alice, chan).unwrap());
        assert_eq!(db.count_subscribers(chan).unwrap(), 0);
    }

    #[test]
    fn concurrent_first_likes_share_one_document() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let owner = fixtures::user(&db, "owner");
        let video = fixtures::video(&db, owner, "viral");
        let fans: Vec<Uuid> = (0..8).map(|i| fixtures::user(&db, &format!("fan{}", i))).collect();

        let handles: Vec<_> = fans
            .iter()
            .map(|&fan| {
                let db = db.clone();
                thread::spawn(move || db.toggle(ToggleTarget::Video(video), fan).unwrap())
            })
            .collect();

        for h in handles {
            assert_eq!(h.join().unwrap(), Some(ToggleOutcome::Activated));
        }

        assert_eq!(like_doc_count(&db, LikeKind::Video, video), 1);
        assert_eq!(db.like_members(LikeKind::Video, video).unwrap().len(), fans.len());
    }
}
