use crate::server::{
    Result, ServerError, ServerRouter,
    json::{Created, Json},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use readit_common::{
    model::{
        Id,
        post::{Post, PostDraft, PostMarker},
        subreddit::SubredditName,
    },
    validation::Draft,
};
use readit_db::store::ForumStore;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_post(create_post)
        .typed_get(list_subreddit_posts)
        .typed_get(get_post)
        .typed_delete(delete_post)
        .typed_patch(upvote_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct PostsPath();

async fn list_posts(
    PostsPath(): PostsPath,
    State(store): State<Arc<dyn ForumStore>>,
) -> Result<Json<Vec<Post>>> {
    let posts = store.fetch_posts().await?;

    Ok(Json(posts))
}

async fn create_post(
    PostsPath(): PostsPath,
    State(store): State<Arc<dyn ForumStore>>,
    Json(draft): Json<PostDraft>,
) -> Result<Created<Post>> {
    let post = store.create_post(&draft.validate()?).await?;
    info!(post_id = %post.id, subreddit_id = %post.subreddit_id, "Created post");

    Ok(Created(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/r/{subreddit}", rejection(ServerError))]
struct SubredditPostsPath {
    subreddit: String,
}

async fn list_subreddit_posts(
    SubredditPostsPath { subreddit }: SubredditPostsPath,
    State(store): State<Arc<dyn ForumStore>>,
) -> Result<Json<Vec<Post>>> {
    // No stored subreddit can have a name that fails validation.
    let Ok(name) = SubredditName::new(subreddit) else {
        return Ok(Json(Vec::new()));
    };

    let posts = store.fetch_subreddit_posts(&name).await?;

    Ok(Json(posts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

async fn get_post(
    PostPath { id }: PostPath,
    State(store): State<Arc<dyn ForumStore>>,
) -> Result<Json<Post>> {
    let post = store
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}

async fn delete_post(
    PostPath { id }: PostPath,
    State(store): State<Arc<dyn ForumStore>>,
) -> Result<StatusCode> {
    if store.delete_post(id).await? == 0 {
        return Err(ServerError::PostByIdNotFound(id));
    }
    info!(post_id = %id, "Deleted post");

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/upvote", rejection(ServerError))]
struct UpvotePath {
    id: Id<PostMarker>,
}

async fn upvote_post(
    UpvotePath { id }: UpvotePath,
    State(store): State<Arc<dyn ForumStore>>,
) -> Result<Json<Post>> {
    let post = store
        .upvote_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}
