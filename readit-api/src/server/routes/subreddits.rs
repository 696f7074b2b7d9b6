use crate::{
    media::{BANNER_FOLDER, ICON_FOLDER, MediaHost},
    server::{
        Result, ServerError, ServerRouter,
        form::{SubredditSubmission, SubredditUpload},
        json::{Created, Json},
    },
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use readit_common::{
    model::{
        Id,
        subreddit::{CreateSubreddit, Subreddit, SubredditMarker},
    },
    validation::Draft,
};
use readit_db::store::ForumStore;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_subreddits)
        .typed_post(create_subreddit)
        .typed_delete(delete_subreddit)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/subreddits", rejection(ServerError))]
struct SubredditsPath();

async fn list_subreddits(
    SubredditsPath(): SubredditsPath,
    State(store): State<Arc<dyn ForumStore>>,
) -> Result<Json<Vec<Subreddit>>> {
    let subreddits = store.fetch_subreddits().await?;

    Ok(Json(subreddits))
}

async fn create_subreddit(
    SubredditsPath(): SubredditsPath,
    State(store): State<Arc<dyn ForumStore>>,
    State(media): State<Arc<dyn MediaHost>>,
    submission: SubredditSubmission,
) -> Result<Created<Subreddit>> {
    let subreddit = match submission {
        SubredditSubmission::Json(draft) => insert_subreddit(&*store, &draft.validate()?).await?,
        SubredditSubmission::Upload(draft) => {
            create_with_assets(store, media, draft.validate()?).await?
        }
    };
    info!(subreddit_id = %subreddit.id, name = subreddit.name.get(), "Created subreddit");

    Ok(Created(subreddit))
}

async fn insert_subreddit(
    store: &dyn ForumStore,
    subreddit: &CreateSubreddit,
) -> Result<Subreddit> {
    store
        .create_subreddit(subreddit)
        .await?
        .ok_or(ServerError::SubredditAlreadyExists)
}

/// Uploads icon and banner, then inserts. Assets uploaded by a request that
/// ends up failing are destroyed again.
///
/// The work runs on its own task, so it finishes (and cleans up) even when
/// the request is dropped by a timeout or a disconnecting client.
async fn create_with_assets(
    store: Arc<dyn ForumStore>,
    media: Arc<dyn MediaHost>,
    upload: SubredditUpload,
) -> Result<Subreddit> {
    let task = tokio::spawn(async move {
        let mut uploaded = Vec::with_capacity(2);

        let result = upload_and_insert(&*store, &*media, upload, &mut uploaded).await;
        if result.is_err() {
            for public_id in &uploaded {
                if let Err(err) = media.destroy(public_id).await {
                    warn!(error = %err, %public_id, "Failed to destroy orphaned upload");
                }
            }
        }

        result
    });

    task.await?
}

async fn upload_and_insert(
    store: &dyn ForumStore,
    media: &dyn MediaHost,
    upload: SubredditUpload,
    uploaded: &mut Vec<String>,
) -> Result<Subreddit> {
    let icon = media.upload(upload.icon, ICON_FOLDER).await?;
    uploaded.push(icon.public_id);

    let banner = media.upload(upload.banner, BANNER_FOLDER).await?;
    uploaded.push(banner.public_id);

    let subreddit = CreateSubreddit {
        name: upload.name,
        icon: Some(icon.url),
        banner: Some(banner.url),
    };
    insert_subreddit(store, &subreddit).await
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/subreddits/{id}", rejection(ServerError))]
struct SubredditPath {
    id: Id<SubredditMarker>,
}

async fn delete_subreddit(
    SubredditPath { id }: SubredditPath,
    State(store): State<Arc<dyn ForumStore>>,
) -> Result<StatusCode> {
    if store.delete_subreddit(id).await? == 0 {
        return Err(ServerError::SubredditByIdNotFound(id));
    }
    info!(subreddit_id = %id, "Deleted subreddit");

    Ok(StatusCode::NO_CONTENT)
}
