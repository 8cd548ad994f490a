use std::collections::HashMap;

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Row, TransactionBehavior};
use uuid::Uuid;

use vidhub_types::models::Video;
use vidhub_types::pagination::PageRequest;

use super::likes::delete_likes_where;
use super::{OptionalExt, id_params, placeholders, uuid_at};
use crate::Database;
use crate::models::{LikeKind, NewVideo, VideoChanges, VideoFilter, VideoSort};

const VIDEO_COLUMNS: &str = "v.id, v.owner, v.title, v.description, v.video_file, v.thumbnail, \
     v.duration, v.views, v.is_published, v.created_at, v.updated_at";

impl Database {
    // -- Videos --

    pub fn insert_video(&self, video: &NewVideo<'_>) -> Result<Video> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO videos (id, owner, title, description, video_file, thumbnail, duration, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                rusqlite::params![
                    id.to_string(),
                    video.owner.to_string(),
                    video.title,
                    video.description,
                    video.video_file,
                    video.thumbnail,
                    video.duration,
                    now,
                ],
            )?;
            Ok(())
        })?;

        Ok(Video {
            id,
            owner: video.owner,
            title: video.title.to_string(),
            description: video.description.to_string(),
            video_file: video.video_file.to_string(),
            thumbnail: video.thumbnail.to_string(),
            duration: video.duration,
            views: 0,
            is_published: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_video(&self, id: Uuid) -> Result<Option<Video>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM videos v WHERE v.id = ?1", VIDEO_COLUMNS);
            conn.query_row(&sql, [id.to_string()], map_video).optional()
        })
    }

    pub fn video_exists(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let exists =
                conn.query_row("SELECT EXISTS(SELECT 1 FROM videos WHERE id = ?1)", [id.to_string()], |r| r.get(0))?;
            Ok(exists)
        })
    }

    /// Batch lookup for joins. Unknown ids are simply absent from the map.
    pub fn get_videos_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Video>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let ids: Vec<String> = ids.iter().map(Uuid::to_string).collect();
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM videos v WHERE v.id IN ({})",
                VIDEO_COLUMNS,
                placeholders(0, ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(id_params(&ids).as_slice(), map_video)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(|v| (v.id, v)).collect())
        })
    }

    /// One window of the feed plus the total number of matching videos.
    pub fn list_videos(
        &self,
        filter: &VideoFilter,
        sort: VideoSort,
        page: PageRequest,
    ) -> Result<(Vec<Video>, u64)> {
        let mut clauses = vec!["(v.is_published = 1 OR v.owner = ?1)".to_string()];
        let mut params = vec![filter.viewer.map(|v| v.to_string()).unwrap_or_default()];

        if let Some(query) = filter.query.as_deref().filter(|q| !q.is_empty()) {
            params.push(query.to_lowercase());
            let n = params.len();
            clauses.push(format!(
                "(instr(unicode_lower(v.title), ?{n}) > 0 OR instr(unicode_lower(v.description), ?{n}) > 0)"
            ));
        }
        if let Some(owner) = filter.owner {
            params.push(owner.to_string());
            clauses.push(format!("v.owner = ?{}", params.len()));
        }

        let where_clause = clauses.join(" AND ");
        let direction = sort.direction.keyword();

        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM videos v WHERE {}", where_clause),
                id_params(&params).as_slice(),
                |row| row.get(0),
            )?;

            let sql = format!(
                "SELECT {} FROM videos v WHERE {}
                 ORDER BY {} {}, v.rowid {}
                 LIMIT {} OFFSET {}",
                VIDEO_COLUMNS,
                where_clause,
                sort.field.column(),
                direction,
                direction,
                page.limit(),
                page.offset()
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(id_params(&params).as_slice(), map_video)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok((rows, total as u64))
        })
    }

    /// Every video of `owner`, published or not, newest first.
    pub fn list_videos_by_owner(&self, owner: Uuid) -> Result<Vec<Video>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM videos v WHERE v.owner = ?1 ORDER BY v.created_at DESC, v.rowid DESC",
                VIDEO_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([owner.to_string()], map_video)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns `(total views, video count)` for an owner.
    pub fn owner_video_totals(&self, owner: Uuid) -> Result<(i64, u64)> {
        self.with_conn(|conn| {
            let (views, count): (i64, i64) = conn.query_row(
                "SELECT COALESCE(SUM(views), 0), COUNT(*) FROM videos WHERE owner = ?1",
                [owner.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok((views, count as u64))
        })
    }

    pub fn update_video(&self, id: Uuid, changes: &VideoChanges<'_>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE videos SET
                    title = COALESCE(?2, title),
                    description = COALESCE(?3, description),
                    thumbnail = COALESCE(?4, thumbnail),
                    updated_at = ?5
                 WHERE id = ?1",
                rusqlite::params![
                    id.to_string(),
                    changes.title,
                    changes.description,
                    changes.thumbnail,
                    Utc::now(),
                ],
            )?;
            Ok(changed == 1)
        })
    }

    /// Flip the publish flag in place. `None` when the video does not exist.
    pub fn toggle_published(&self, id: Uuid) -> Result<Option<bool>> {
        self.with_conn(|conn| {
            conn.query_row(
                "UPDATE videos SET is_published = NOT is_published, updated_at = ?2
                 WHERE id = ?1 RETURNING is_published",
                rusqlite::params![id.to_string(), Utc::now()],
                |row| row.get(0),
            )
            .optional()
        })
    }

    pub fn increment_views(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("UPDATE videos SET views = views + 1 WHERE id = ?1", [id.to_string()])?;
            Ok(changed == 1)
        })
    }

    /// Delete a video with everything hanging off it. Comments, playlist
    /// entries, and history rows go through foreign-key cascades; like
    /// documents are polymorphic and are removed explicitly.
    pub fn delete_video(&self, id: Uuid) -> Result<bool> {
        let id = id.to_string();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            delete_likes_where(&tx, LikeKind::Comment, "SELECT id FROM comments WHERE video_id = ?2", &id)?;
            delete_likes_where(&tx, LikeKind::Video, "SELECT ?2", &id)?;
            let removed = tx.execute("DELETE FROM videos WHERE id = ?1", [&id])?;

            tx.commit()?;
            Ok(removed == 1)
        })
    }
}

pub(crate) fn map_video(row: &Row<'_>) -> rusqlite::Result<Video> {
    Ok(Video {
        id: uuid_at(row, 0)?,
        owner: uuid_at(row, 1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        video_file: row.get(4)?,
        thumbnail: row.get(5)?,
        duration: row.get(6)?,
        views: row.get(7)?,
        is_published: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}
