use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE COLLATE NOCASE,
                email       TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password    TEXT NOT NULL,
                fullname    TEXT NOT NULL,
                avatar      TEXT NOT NULL,
                cover_image TEXT,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            -- One row per live refresh token. Only the SHA-256 of the token is kept.
            CREATE TABLE sessions (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                token_hash  TEXT NOT NULL UNIQUE,
                device      TEXT,
                issued_at   TEXT NOT NULL,
                expires_at  TEXT NOT NULL
            );

            CREATE INDEX idx_sessions_user ON sessions(user_id);

            CREATE TABLE videos (
                id           TEXT PRIMARY KEY,
                owner        TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title        TEXT NOT NULL,
                description  TEXT NOT NULL,
                video_file   TEXT NOT NULL,
                thumbnail    TEXT NOT NULL,
                duration     REAL NOT NULL DEFAULT 0,
                views        INTEGER NOT NULL DEFAULT 0,
                is_published INTEGER NOT NULL DEFAULT 1,
                created_at   TEXT NOT NULL,
                updated_at   TEXT NOT NULL
            );

            CREATE INDEX idx_videos_owner ON videos(owner, created_at);
            CREATE INDEX idx_videos_created ON videos(created_at);

            CREATE TABLE comments (
                id          TEXT PRIMARY KEY,
                video_id    TEXT NOT NULL REFERENCES videos(id) ON DELETE CASCADE,
                owner       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_comments_video ON comments(video_id, created_at);

            -- One like document per target; (target_kind, target_id) names exactly one
            -- video, comment, or tweet.
            CREATE TABLE likes (
                id           TEXT PRIMARY KEY,
                target_kind  TEXT NOT NULL CHECK (target_kind IN ('video', 'comment', 'tweet')),
                target_id    TEXT NOT NULL,
                created_at   TEXT NOT NULL,
                UNIQUE(target_kind, target_id)
            );

            CREATE TABLE like_members (
                like_id     TEXT NOT NULL REFERENCES likes(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                PRIMARY KEY (like_id, user_id)
            );

            CREATE INDEX idx_like_members_user ON like_members(user_id);

            CREATE TABLE subscriptions (
                id          TEXT PRIMARY KEY,
                subscriber  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                channel     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                UNIQUE(subscriber, channel)
            );

            CREATE INDEX idx_subscriptions_channel ON subscriptions(channel);

            CREATE TABLE playlists (
                id          TEXT PRIMARY KEY,
                owner       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                name        TEXT NOT NULL,
                description TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_playlists_owner ON playlists(owner);

            CREATE TABLE playlist_videos (
                playlist_id TEXT NOT NULL REFERENCES playlists(id) ON DELETE CASCADE,
                video_id    TEXT NOT NULL REFERENCES videos(id) ON DELETE CASCADE,
                position    INTEGER NOT NULL,
                added_at    TEXT NOT NULL,
                PRIMARY KEY (playlist_id, video_id)
            );

            CREATE TABLE tweets (
                id          TEXT PRIMARY KEY,
                owner       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_tweets_owner ON tweets(owner, created_at);

            -- One entry per (user, video); `position` grows on every watch so the
            -- latest watch sorts first.
            CREATE TABLE watch_history (
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                video_id    TEXT NOT NULL REFERENCES videos(id) ON DELETE CASCADE,
                position    INTEGER NOT NULL,
                watched_at  TEXT NOT NULL,
                PRIMARY KEY (user_id, video_id)
            );

            CREATE INDEX idx_watch_history_user ON watch_history(user_id, position);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }
}
