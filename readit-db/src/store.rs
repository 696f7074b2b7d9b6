use crate::client::Result;
use async_trait::async_trait;
use readit_common::model::{
    Id,
    post::{CreatePost, Post, PostMarker},
    subreddit::{CreateSubreddit, Subreddit, SubredditMarker, SubredditName},
};

/// Data access used by the HTTP layer.
///
/// Lists are ordered newest first. Deletes return the number of affected rows
/// so callers can tell a missing row from a deleted one.
#[async_trait]
pub trait ForumStore: Send + Sync {
    async fn fetch_posts(&self) -> Result<Vec<Post>>;

    async fn fetch_subreddit_posts(&self, subreddit: &SubredditName) -> Result<Vec<Post>>;

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>>;

    /// Fails with [`DbError::UnknownSubreddit`](crate::client::DbError::UnknownSubreddit)
    /// if the referenced subreddit does not exist.
    async fn create_post(&self, post: &CreatePost) -> Result<Post>;

    /// Increments the upvote counter by one and returns the updated post.
    async fn upvote_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>>;

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<u64>;

    async fn fetch_subreddits(&self) -> Result<Vec<Subreddit>>;

    /// Returns `None` if a subreddit with the same name already exists.
    async fn create_subreddit(&self, subreddit: &CreateSubreddit) -> Result<Option<Subreddit>>;

    /// Deleting a subreddit also deletes its posts.
    async fn delete_subreddit(&self, subreddit_id: Id<SubredditMarker>) -> Result<u64>;
}
