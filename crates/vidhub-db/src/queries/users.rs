use std::collections::HashMap;

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, Row};
use uuid::Uuid;

use super::{OptionalExt, id_params, placeholders, uuid_at};
use crate::Database;
use crate::models::{NewUser, UserRow};

const USER_COLUMNS: &str =
    "id, username, email, password, fullname, avatar, cover_image, created_at, updated_at";

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &NewUser<'_>) -> Result<UserRow> {
        let now = Utc::now();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password, fullname, avatar, cover_image, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                rusqlite::params![
                    user.id.to_string(),
                    user.username,
                    user.email,
                    user.password_hash,
                    user.fullname,
                    user.avatar,
                    user.cover_image,
                    now,
                ],
            )?;
            Ok(UserRow {
                id: user.id,
                username: user.username.to_string(),
                email: user.email.to_string(),
                password: user.password_hash.to_string(),
                fullname: user.fullname.to_string(),
                avatar: user.avatar.to_string(),
                cover_image: user.cover_image.map(str::to_string),
                created_at: now,
                updated_at: now,
            })
        })
    }

    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", &id.to_string()))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username = ?1", username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email = ?1", email))
    }

    /// Whether any principal already holds this username or this email.
    pub fn user_exists(&self, username: &str, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 OR email = ?2)",
                (username, email),
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Batch lookup for joins. Unknown ids are simply absent from the map.
    pub fn get_users_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, UserRow>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let ids: Vec<String> = ids.iter().map(Uuid::to_string).collect();
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM users WHERE id IN ({})",
                USER_COLUMNS,
                placeholders(0, ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(id_params(&ids).as_slice(), map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows.into_iter().map(|u| (u.id, u)).collect())
        })
    }

    pub fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool> {
        self.update_user_field(id, "password", password_hash)
    }

    pub fn update_avatar(&self, id: Uuid, avatar: &str) -> Result<bool> {
        self.update_user_field(id, "avatar", avatar)
    }

    pub fn update_cover_image(&self, id: Uuid, cover_image: &str) -> Result<bool> {
        self.update_user_field(id, "cover_image", cover_image)
    }

    pub fn update_account(&self, id: Uuid, fullname: &str, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET fullname = ?2, email = ?3, updated_at = ?4 WHERE id = ?1",
                rusqlite::params![id.to_string(), fullname, email, Utc::now()],
            )?;
            Ok(changed == 1)
        })
    }

    fn update_user_field(&self, id: Uuid, column: &'static str, value: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let sql = format!("UPDATE users SET {} = ?2, updated_at = ?3 WHERE id = ?1", column);
            let changed = conn.execute(&sql, rusqlite::params![id.to_string(), value, Utc::now()])?;
            Ok(changed == 1)
        })
    }
}

fn query_user(conn: &Connection, predicate: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, predicate);
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([value], map_user).optional()
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: uuid_at(row, 0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        fullname: row.get(4)?,
        avatar: row.get(5)?,
        cover_image: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}
