use anyhow::Result;
use uuid::Uuid;

use super::uuid_at;
use crate::Database;

impl Database {
    // -- Subscriptions (reads; writes go through `toggle`) --

    pub fn count_subscribers(&self, channel: Uuid) -> Result<u64> {
        self.count_subscriptions("channel", channel)
    }

    pub fn count_subscribed_to(&self, subscriber: Uuid) -> Result<u64> {
        self.count_subscriptions("subscriber", subscriber)
    }

    pub fn is_subscribed(&self, subscriber: Uuid, channel: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM subscriptions WHERE subscriber = ?1 AND channel = ?2)",
                (subscriber.to_string(), channel.to_string()),
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Subscribers of `channel`, earliest subscription first.
    pub fn subscriber_ids(&self, channel: Uuid) -> Result<Vec<Uuid>> {
        self.other_side("subscriber", "channel", channel)
    }

    /// Channels `subscriber` follows, earliest subscription first.
    pub fn subscribed_channel_ids(&self, subscriber: Uuid) -> Result<Vec<Uuid>> {
        self.other_side("channel", "subscriber", subscriber)
    }

    fn count_subscriptions(&self, column: &'static str, id: Uuid) -> Result<u64> {
        self.with_conn(|conn| {
            let sql = format!("SELECT COUNT(*) FROM subscriptions WHERE {} = ?1", column);
            let count: i64 = conn.query_row(&sql, [id.to_string()], |row| row.get(0))?;
            Ok(count as u64)
        })
    }

    fn other_side(&self, select: &'static str, filter: &'static str, id: Uuid) -> Result<Vec<Uuid>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM subscriptions WHERE {} = ?1 ORDER BY created_at, rowid",
                select, filter
            );
            let mut stmt = conn.prepare(&sql)?;
            let ids = stmt
                .query_map([id.to_string()], |row| uuid_at(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }
}
