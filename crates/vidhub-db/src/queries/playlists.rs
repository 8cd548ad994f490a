use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, Row};
use uuid::Uuid;

use vidhub_types::models::Playlist;

use super::{OptionalExt, uuid_at};
use crate::Database;

const PLAYLIST_COLUMNS: &str = "id, owner, name, description, created_at, updated_at";

impl Database {
    // -- Playlists --

    pub fn insert_playlist(&self, owner: Uuid, name: &str, description: &str) -> Result<Playlist> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO playlists (id, owner, name, description, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                rusqlite::params![id.to_string(), owner.to_string(), name, description, now],
            )?;
            Ok(())
        })?;

        Ok(Playlist {
            id,
            owner,
            name: name.to_string(),
            description: description.to_string(),
            videos: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Playlist with its video ids in the order they were added.
    pub fn get_playlist(&self, id: Uuid) -> Result<Option<Playlist>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM playlists WHERE id = ?1", PLAYLIST_COLUMNS);
            let Some(mut playlist) = conn.query_row(&sql, [id.to_string()], map_playlist).optional()?
            else {
                return Ok(None);
            };
            playlist.videos = playlist_video_ids(conn, id)?;
            Ok(Some(playlist))
        })
    }

    pub fn list_playlists_by_owner(&self, owner: Uuid) -> Result<Vec<Playlist>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM playlists WHERE owner = ?1 ORDER BY created_at DESC, rowid DESC",
                PLAYLIST_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut playlists = stmt
                .query_map([owner.to_string()], map_playlist)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            for playlist in &mut playlists {
                playlist.videos = playlist_video_ids(conn, playlist.id)?;
            }
            Ok(playlists)
        })
    }

    pub fn update_playlist(&self, id: Uuid, name: &str, description: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE playlists SET name = ?2, description = ?3, updated_at = ?4 WHERE id = ?1",
                rusqlite::params![id.to_string(), name, description, Utc::now()],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn delete_playlist(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM playlists WHERE id = ?1", [id.to_string()])? == 1)
        })
    }

    /// Append `video` to the playlist. Returns false if it was already there.
    pub fn add_video_to_playlist(&self, playlist: Uuid, video: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let added = conn.execute(
                "INSERT OR IGNORE INTO playlist_videos (playlist_id, video_id, position, added_at)
                 VALUES (?1, ?2,
                         (SELECT COALESCE(MAX(position), 0) + 1 FROM playlist_videos WHERE playlist_id = ?1),
                         ?3)",
                rusqlite::params![playlist.to_string(), video.to_string(), Utc::now()],
            )?;
            if added == 1 {
                touch_playlist(conn, playlist)?;
            }
            Ok(added == 1)
        })
    }

    /// Returns false if the video was not in the playlist.
    pub fn remove_video_from_playlist(&self, playlist: Uuid, video: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM playlist_videos WHERE playlist_id = ?1 AND video_id = ?2",
                (playlist.to_string(), video.to_string()),
            )?;
            if removed == 1 {
                touch_playlist(conn, playlist)?;
            }
            Ok(removed == 1)
        })
    }
}

fn playlist_video_ids(conn: &Connection, playlist: Uuid) -> Result<Vec<Uuid>> {
    let mut stmt = conn.prepare(
        "SELECT video_id FROM playlist_videos WHERE playlist_id = ?1 ORDER BY position",
    )?;
    let ids = stmt
        .query_map([playlist.to_string()], |row| uuid_at(row, 0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids)
}

fn touch_playlist(conn: &Connection, playlist: Uuid) -> Result<()> {
    conn.execute(
        "UPDATE playlists SET updated_at = ?2 WHERE id = ?1",
        rusqlite::params![playlist.to_string(), Utc::now()],
    )?;
    Ok(())
}

fn map_playlist(row: &Row<'_>) -> rusqlite::Result<Playlist> {
    Ok(Playlist {
        id: uuid_at(row, 0)?,
        owner: uuid_at(row, 1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        videos: Vec::new(),
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures;

    #[test]
    fn videos_keep_insertion_order() {
        let db = Database::open_in_memory().unwrap();
        let alice = fixtures::user(&db, "alice");
        let v1 = fixtures::video(&db, alice, "one");
        let v2 = fixtures::video(&db, alice, "two");
        let v3 = fixtures::video(&db, alice, "three");
        let p = db.insert_playlist(alice, "mix", "favourites").unwrap();

        assert!(db.add_video_to_playlist(p.id, v2).unwrap());
        assert!(db.add_video_to_playlist(p.id, v1).unwrap());
        assert!(!db.add_video_to_playlist(p.id, v2).unwrap());
        assert!(db.add_video_to_playlist(p.id, v3).unwrap());
        assert!(db.remove_video_from_playlist(p.id, v1).unwrap());
        assert!(!db.remove_video_from_playlist(p.id, v1).unwrap());

        let stored = db.get_playlist(p.id).unwrap().unwrap();
        assert_eq!(stored.videos, vec![v2, v3]);
    }

    #[test]
    fn owner_listing_and_deletion() {
        let db = Database::open_in_memory().unwrap();
        let alice = fixtures::user(&db, "alice");
        let bob = fixtures::user(&db, "bob");
        let first = db.insert_playlist(alice, "first", "").unwrap();
        let second = db.insert_playlist(alice, "second", "").unwrap();
        db.insert_playlist(bob, "bobs", "").unwrap();

        let ids: Vec<_> = db
            .list_playlists_by_owner(alice)
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);

        assert!(db.update_playlist(first.id, "renamed", "now with text").unwrap());
        assert_eq!(db.get_playlist(first.id).unwrap().unwrap().name, "renamed");

        assert!(db.delete_playlist(first.id).unwrap());
        assert!(db.get_playlist(first.id).unwrap().is_none());
        assert!(!db.delete_playlist(first.id).unwrap());
    }
}
