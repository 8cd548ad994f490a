/// Database row types and query parameters.
/// Rows that carry secrets (password hashes, session fingerprints) stay here;
/// everything safe to hand out is mapped straight into `vidhub-types` models.
use chrono::{DateTime, Utc};
use uuid::Uuid;

use vidhub_types::models::{PublicUser, User};

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password: String,
    pub fullname: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            username: self.username.clone(),
            fullname: self.fullname.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            fullname: row.fullname,
            avatar: row.avatar,
            cover_image: row.cover_image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct NewUser<'a> {
    pub id: Uuid,
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub fullname: &'a str,
    pub avatar: &'a str,
    pub cover_image: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct SessionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub device: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub struct NewSession<'a> {
    pub user_id: Uuid,
    pub token_hash: &'a str,
    pub device: Option<&'a str>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Which existing sessions a newly issued one replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eviction {
    /// Every session of the principal: one active session at a time.
    AllForUser,
    /// Only sessions carrying the same device tag.
    SameDevice,
}

pub struct NewVideo<'a> {
    pub owner: Uuid,
    pub title: &'a str,
    pub description: &'a str,
    pub video_file: &'a str,
    pub thumbnail: &'a str,
    pub duration: f64,
}

#[derive(Debug, Default)]
pub struct VideoChanges<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub thumbnail: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoSortField {
    CreatedAt,
    UpdatedAt,
    Title,
    Views,
    Duration,
}

impl VideoSortField {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "createdAt" | "created_at" => Some(Self::CreatedAt),
            "updatedAt" | "updated_at" => Some(Self::UpdatedAt),
            "title" => Some(Self::Title),
            "views" => Some(Self::Views),
            "duration" => Some(Self::Duration),
            _ => None,
        }
    }

    pub(crate) fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "v.created_at",
            Self::UpdatedAt => "v.updated_at",
            Self::Title => "v.title COLLATE NOCASE",
            Self::Views => "v.views",
            Self::Duration => "v.duration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub(crate) fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoSort {
    pub field: VideoSortField,
    pub direction: SortDirection,
}

impl Default for VideoSort {
    fn default() -> Self {
        Self {
            field: VideoSortField::CreatedAt,
            direction: SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VideoFilter {
    /// Case-insensitive substring matched against title or description.
    pub query: Option<String>,
    pub owner: Option<Uuid>,
    /// Unpublished videos of this principal are listed too.
    pub viewer: Option<Uuid>,
}

/// Kinds of object a like document can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeKind {
    Video,
    Comment,
    Tweet,
}

impl LikeKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Comment => "comment",
            Self::Tweet => "tweet",
        }
    }
}

/// Key of a toggleable relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleTarget {
    Video(Uuid),
    Comment(Uuid),
    Tweet(Uuid),
    /// Subscribe/unsubscribe to the channel owned by this principal.
    Channel(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Activated,
    Deactivated,
}

impl ToggleOutcome {
    pub fn is_active(self) -> bool {
        self == Self::Activated
    }
}
