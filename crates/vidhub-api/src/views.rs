//! Read-only joined views.
//!
//! Each view fetches its parent rows, batch-fetches the related rows by
//! foreign key, and assembles the result in memory. Nothing here writes.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use vidhub_db::Database;
use vidhub_db::models::{LikeKind, VideoFilter, VideoSort};
use vidhub_types::models::{
    ChannelProfile, ChannelStats, CommentWithOwner, LikedVideo, Playlist, PlaylistWithVideos,
    PublicUser, TweetWithOwner, Video, VideoDetail, VideoWithOwner,
};
use vidhub_types::pagination::{Page, PageRequest};

use crate::error::ApiError;

pub struct Views<'a> {
    db: &'a Database,
}

impl<'a> Views<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn channel_profile(&self, username: &str, viewer: Uuid) -> Result<ChannelProfile, ApiError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ApiError::InvalidArgument("username is missing".into()));
        }

        let user = self
            .db
            .get_user_by_username(username)?
            .ok_or_else(|| ApiError::NotFound("Channel does not exist".into()))?;

        Ok(ChannelProfile {
            subscribers_count: self.db.count_subscribers(user.id)?,
            channels_subscribed_to_count: self.db.count_subscribed_to(user.id)?,
            is_subscribed: self.db.is_subscribed(viewer, user.id)?,
            id: user.id,
            username: user.username,
            fullname: user.fullname,
            email: user.email,
            avatar: user.avatar,
            cover_image: user.cover_image,
        })
    }

    /// Most recently watched first. Videos deleted since are skipped.
    pub fn watch_history(&self, user: Uuid) -> Result<Vec<VideoWithOwner>, ApiError> {
        let ids = self.db.watch_history_ids(user)?;
        let mut videos = self.db.get_videos_by_ids(&ids)?;
        let ordered: Vec<Video> = ids.iter().filter_map(|id| videos.remove(id)).collect();
        self.with_owners(ordered)
    }

    pub fn liked_videos(&self, user: Uuid) -> Result<Vec<LikedVideo>, ApiError> {
        let ids = self.db.liked_video_ids(user)?;
        let mut videos = self.db.get_videos_by_ids(&ids)?;

        Ok(ids
            .iter()
            .filter_map(|id| videos.remove(id))
            .map(|v| LikedVideo {
                id: v.id,
                title: v.title,
            })
            .collect())
    }

    pub fn video_feed(
        &self,
        filter: &VideoFilter,
        sort: VideoSort,
        page: PageRequest,
    ) -> Result<Page<VideoWithOwner>, ApiError> {
        let (videos, total) = self.db.list_videos(filter, sort, page)?;
        let docs = self.with_owners(videos)?;
        Ok(Page::from_window(docs, total, page))
    }

    pub fn video_comments(&self, video: Uuid, page: PageRequest) -> Result<Page<CommentWithOwner>, ApiError> {
        if !self.db.video_exists(video)? {
            return Err(ApiError::NotFound("Video not found".into()));
        }

        let (comments, total) = self.db.list_comments(video, page)?;
        let owners = self.owners(comments.iter().map(|c| c.owner))?;

        let docs = comments
            .into_iter()
            .filter_map(|c| {
                let owner = owners.get(&c.owner)?.clone();
                Some(CommentWithOwner {
                    id: c.id,
                    video: c.video,
                    content: c.content,
                    created_at: c.created_at,
                    updated_at: c.updated_at,
                    owner,
                })
            })
            .collect();

        Ok(Page::from_window(docs, total, page))
    }

    pub fn channel_subscribers(&self, channel: Uuid) -> Result<Vec<PublicUser>, ApiError> {
        let ids = self.db.subscriber_ids(channel)?;
        self.users_in_order(&ids)
    }

    pub fn subscribed_channels(&self, subscriber: Uuid) -> Result<Vec<PublicUser>, ApiError> {
        let ids = self.db.subscribed_channel_ids(subscriber)?;
        self.users_in_order(&ids)
    }

    /// A single video as `viewer` sees it. Unpublished videos exist only for
    /// their owner.
    pub fn video_detail(&self, video: Uuid, viewer: Uuid) -> Result<VideoDetail, ApiError> {
        let video = self
            .db
            .get_video(video)?
            .filter(|v| v.is_published || v.owner == viewer)
            .ok_or_else(|| ApiError::NotFound("Video not found".into()))?;

        let likes_count = self.db.like_count(LikeKind::Video, video.id)?;
        let is_liked = self.db.is_liked(LikeKind::Video, video.id, viewer)?;
        let owner = self
            .db
            .get_user_by_id(video.owner)?
            .ok_or_else(|| ApiError::NotFound("Video owner not found".into()))?
            .public();

        Ok(VideoDetail {
            video: VideoWithOwner::new(video, owner),
            likes_count,
            is_liked,
        })
    }

    pub fn user_playlists(&self, user: Uuid) -> Result<Vec<Playlist>, ApiError> {
        Ok(self.db.list_playlists_by_owner(user)?)
    }

    pub fn playlist_detail(&self, playlist: Uuid) -> Result<PlaylistWithVideos, ApiError> {
        let playlist = self
            .db
            .get_playlist(playlist)?
            .ok_or_else(|| ApiError::NotFound("Playlist not found".into()))?;

        let owner = self
            .db
            .get_user_by_id(playlist.owner)?
            .ok_or_else(|| ApiError::NotFound("Playlist owner not found".into()))?
            .public();

        let mut by_id = self.db.get_videos_by_ids(&playlist.videos)?;
        let videos: Vec<Video> = playlist.videos.iter().filter_map(|id| by_id.remove(id)).collect();

        Ok(PlaylistWithVideos {
            id: playlist.id,
            name: playlist.name,
            description: playlist.description,
            owner,
            total_videos: videos.len() as u64,
            videos,
            created_at: playlist.created_at,
            updated_at: playlist.updated_at,
        })
    }

    pub fn user_tweets(&self, user: Uuid) -> Result<Vec<TweetWithOwner>, ApiError> {
        let owner = self
            .db
            .get_user_by_id(user)?
            .ok_or_else(|| ApiError::NotFound("User not found".into()))?
            .public();

        let tweets = self.db.list_tweets_by_owner(user)?;
        let ids: Vec<Uuid> = tweets.iter().map(|t| t.id).collect();
        let likes = self.db.like_counts(LikeKind::Tweet, &ids)?;

        Ok(tweets
            .into_iter()
            .map(|t| TweetWithOwner {
                likes_count: likes.get(&t.id).copied().unwrap_or(0),
                id: t.id,
                content: t.content,
                created_at: t.created_at,
                updated_at: t.updated_at,
                owner: owner.clone(),
            })
            .collect())
    }

    pub fn channel_stats(&self, owner: Uuid) -> Result<ChannelStats, ApiError> {
        let (total_views, total_videos) = self.db.owner_video_totals(owner)?;
        Ok(ChannelStats {
            total_views,
            total_videos,
            total_subscribers: self.db.count_subscribers(owner)?,
            total_likes: self.db.count_likes_on_owner_videos(owner)?,
        })
    }

    pub fn channel_videos(&self, owner: Uuid) -> Result<Vec<Video>, ApiError> {
        Ok(self.db.list_videos_by_owner(owner)?)
    }

    fn owners(&self, ids: impl Iterator<Item = Uuid>) -> Result<HashMap<Uuid, PublicUser>, ApiError> {
        let ids: Vec<Uuid> = ids.collect::<HashSet<_>>().into_iter().collect();
        Ok(self
            .db
            .get_users_by_ids(&ids)?
            .into_iter()
            .map(|(id, row)| (id, row.public()))
            .collect())
    }

    fn with_owners(&self, videos: Vec<Video>) -> Result<Vec<VideoWithOwner>, ApiError> {
        let owners = self.owners(videos.iter().map(|v| v.owner))?;
        Ok(videos
            .into_iter()
            .filter_map(|v| {
                let owner = owners.get(&v.owner)?.clone();
                Some(VideoWithOwner::new(v, owner))
            })
            .collect())
    }

    fn users_in_order(&self, ids: &[Uuid]) -> Result<Vec<PublicUser>, ApiError> {
        let mut users = self.db.get_users_by_ids(ids)?;
        Ok(ids
            .iter()
            .filter_map(|id| users.remove(id))
            .map(|row| row.public())
            .collect())
    }
}
