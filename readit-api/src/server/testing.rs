//! In-memory collaborators for router tests.

use crate::{
    media::{MediaError, MediaFile, MediaHost, UploadedMedia},
    server::{ServerLimits, ServerState, app},
};
use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header::CONTENT_TYPE},
};
use readit_common::model::{
    Id, ModelValidationError,
    post::{CreatePost, Post, PostMarker},
    subreddit::{CreateSubreddit, Subreddit, SubredditMarker, SubredditName},
};
use readit_db::{
    client::{DbError, Result},
    store::ForumStore,
};
use serde_json::Value;
use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use time::OffsetDateTime;
use tower::ServiceExt;

#[derive(Default)]
struct MemoryState {
    last_subreddit_id: i64,
    last_post_id: i64,
    subreddits: Vec<Subreddit>,
    posts: Vec<Post>,
}

/// Keeps rows in insertion order, so newest first is reverse order.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    failing: bool,
}

impl MemoryStore {
    pub fn posts(&self) -> Vec<Post> {
        self.state.lock().unwrap().posts.clone()
    }

    pub fn subreddits(&self) -> Vec<Subreddit> {
        self.state.lock().unwrap().subreddits.clone()
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>> {
        if self.failing {
            return Err(DbError::Data(ModelValidationError::NegativeUpvotes(-1)));
        }
        Ok(self.state.lock().unwrap())
    }
}

#[async_trait]
impl ForumStore for MemoryStore {
    async fn fetch_posts(&self) -> Result<Vec<Post>> {
        Ok(self.state()?.posts.iter().rev().cloned().collect())
    }

    async fn fetch_subreddit_posts(&self, subreddit: &SubredditName) -> Result<Vec<Post>> {
        let state = self.state()?;
        let posts = state
            .posts
            .iter()
            .rev()
            .filter(|post| post.subreddit == *subreddit)
            .cloned()
            .collect();
        Ok(posts)
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let state = self.state()?;
        Ok(state.posts.iter().find(|post| post.id == post_id).cloned())
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let mut state = self.state()?;
        let subreddit = state
            .subreddits
            .iter()
            .find(|subreddit| subreddit.id == post.subreddit_id)
            .map(|subreddit| subreddit.name.clone())
            .ok_or(DbError::UnknownSubreddit(post.subreddit_id))?;

        state.last_post_id += 1;
        let created = Post {
            id: Id::new(state.last_post_id),
            title: post.title.clone(),
            body: post.body.clone(),
            subreddit_id: post.subreddit_id,
            subreddit,
            upvotes: 0,
            image: post.image.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        state.posts.push(created.clone());
        Ok(created)
    }

    async fn upvote_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let mut state = self.state()?;
        let post = state.posts.iter_mut().find(|post| post.id == post_id);
        Ok(post.map(|post| {
            post.upvotes += 1;
            post.clone()
        }))
    }

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<u64> {
        let mut state = self.state()?;
        let before = state.posts.len();
        state.posts.retain(|post| post.id != post_id);
        Ok((before - state.posts.len()) as u64)
    }

    async fn fetch_subreddits(&self) -> Result<Vec<Subreddit>> {
        Ok(self.state()?.subreddits.iter().rev().cloned().collect())
    }

    async fn create_subreddit(&self, subreddit: &CreateSubreddit) -> Result<Option<Subreddit>> {
        let mut state = self.state()?;
        if state
            .subreddits
            .iter()
            .any(|existing| existing.name == subreddit.name)
        {
            return Ok(None);
        }

        state.last_subreddit_id += 1;
        let created = Subreddit {
            id: Id::new(state.last_subreddit_id),
            name: subreddit.name.clone(),
            icon: subreddit.icon.clone(),
            banner: subreddit.banner.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        state.subreddits.push(created.clone());
        Ok(Some(created))
    }

    async fn delete_subreddit(&self, subreddit_id: Id<SubredditMarker>) -> Result<u64> {
        let mut state = self.state()?;
        let before = state.subreddits.len();
        state.subreddits.retain(|subreddit| subreddit.id != subreddit_id);
        let deleted = before - state.subreddits.len();

        if deleted > 0 {
            state.posts.retain(|post| post.subreddit_id != subreddit_id);
        }
        Ok(deleted as u64)
    }
}

/// Records every call; public ids are `{folder}/{file_name}`.
#[derive(Default)]
pub struct RecordingMediaHost {
    uploads: Mutex<Vec<(String, String)>>,
    destroyed: Mutex<Vec<String>>,
    failing_folder: Option<&'static str>,
    slow_folder: Option<(&'static str, Duration)>,
}

impl RecordingMediaHost {
    /// Uploads into `folder` are refused.
    pub fn failing_on(self, folder: &'static str) -> Self {
        Self {
            failing_folder: Some(folder),
            ..self
        }
    }

    /// Uploads into `folder` take `delay` before they complete.
    pub fn slow_on(self, folder: &'static str, delay: Duration) -> Self {
        Self {
            slow_folder: Some((folder, delay)),
            ..self
        }
    }

    pub fn uploads(&self) -> Vec<(String, String)> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn destroyed(&self) -> Vec<String> {
        self.destroyed.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaHost for RecordingMediaHost {
    async fn upload(&self, file: MediaFile, folder: &str) -> Result<UploadedMedia, MediaError> {
        if let Some((_, delay)) = self.slow_folder.filter(|(slow, _)| *slow == folder) {
            tokio::time::sleep(delay).await;
        }

        if self.failing_folder == Some(folder) {
            return Err(MediaError::Rejected {
                status: StatusCode::BAD_GATEWAY,
                message: "upload refused".to_owned(),
            });
        }

        self.uploads
            .lock()
            .unwrap()
            .push((folder.to_owned(), file.file_name.clone()));
        Ok(UploadedMedia {
            url: format!("https://media.test/{folder}/{}", file.file_name),
            public_id: format!("{folder}/{}", file.file_name),
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<(), MediaError> {
        self.destroyed.lock().unwrap().push(public_id.to_owned());
        Ok(())
    }
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub media: Arc<RecordingMediaHost>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_media(RecordingMediaHost::default())
    }

    pub fn failing_store() -> Self {
        let store = MemoryStore {
            failing: true,
            ..MemoryStore::default()
        };
        Self::from_parts(store, RecordingMediaHost::default(), ServerLimits::default())
    }

    pub fn with_failing_folder(folder: &'static str) -> Self {
        Self::with_media(RecordingMediaHost::default().failing_on(folder))
    }

    pub fn with_media(media: RecordingMediaHost) -> Self {
        Self::from_parts(MemoryStore::default(), media, ServerLimits::default())
    }

    pub fn from_parts(store: MemoryStore, media: RecordingMediaHost, limits: ServerLimits) -> Self {
        let store = Arc::new(store);
        let media = Arc::new(media);
        let router = app(
            ServerState {
                store: store.clone(),
                media: media.clone(),
            },
            limits,
        );

        Self {
            store,
            media,
            router,
        }
    }

    /// Returns the status and the JSON body, or `Value::Null` for an empty body.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        if bytes.is_empty() {
            (status, Value::Null)
        } else {
            (status, serde_json::from_slice(&bytes).unwrap())
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(json_request(Method::GET, uri, &Value::Null)).await
    }
}

/// Builds a request with `body` as JSON, or with no body when it is null.
pub fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);

    if body.is_null() {
        builder.body(Body::empty()).unwrap()
    } else {
        builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }
}

pub struct FormPart {
    name: &'static str,
    file_name: Option<&'static str>,
    content: Vec<u8>,
}

impl FormPart {
    pub fn text(name: &'static str, value: &str) -> Self {
        Self {
            name,
            file_name: None,
            content: value.as_bytes().to_vec(),
        }
    }

    pub fn file(name: &'static str, file_name: &'static str, content: &[u8]) -> Self {
        Self {
            name,
            file_name: Some(file_name),
            content: content.to_vec(),
        }
    }
}

pub fn multipart_request(uri: &str, parts: &[FormPart]) -> Request<Body> {
    const BOUNDARY: &str = "readit-test-boundary";

    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part.file_name {
            Some(file_name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{file_name}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n",
                    part.name
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    part.name
                )
                .as_bytes(),
            ),
        }
        body.extend_from_slice(&part.content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}
