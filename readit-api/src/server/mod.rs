use crate::media::{MediaError, MediaHost};
use axum::{
    BoxError, Router,
    error_handling::HandleErrorLayer,
    extract::{
        DefaultBodyLimit, FromRef,
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, PathRejection},
    },
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use json::Json;
use readit_common::{
    model::{Id, post::PostMarker, subreddit::SubredditMarker},
    validation::DraftError,
};
use readit_db::{client::DbError, store::ForumStore};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::task::JoinError;
use tower::{
    ServiceBuilder,
    timeout::{TimeoutLayer, error::Elapsed},
};
use tracing::{debug, error};

mod form;
mod json;
mod routes;
#[cfg(test)]
mod testing;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub store: Arc<dyn ForumStore>,
    pub media: Arc<dyn MediaHost>,
}

#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub struct ServerLimits {
    pub max_body_bytes: usize,
    pub request_timeout: Duration,
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            max_body_bytes: 10 * 1024 * 1024,
            request_timeout: Duration::from_secs(60),
        }
    }
}

pub fn routes() -> ServerRouter {
    routes::routes()
        .fallback(fallback)
        .method_not_allowed_fallback(method_not_allowed)
}

/// The routes with body limit and request timeout applied.
pub fn app(state: ServerState, limits: ServerLimits) -> Router {
    routes()
        .layer(DefaultBodyLimit::max(limits.max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(limits.request_timeout)),
        )
        .with_state(state)
}

pub async fn fallback(uri: Uri) -> ServerError {
    ServerError::UnknownRoute(uri)
}

pub async fn method_not_allowed(method: Method, uri: Uri) -> ServerError {
    ServerError::MethodNotAllowed(method, uri)
}

async fn handle_middleware_error(err: BoxError) -> ServerError {
    if err.is::<Elapsed>() {
        ServerError::RequestTimeout
    } else {
        ServerError::Middleware(err)
    }
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Method {0} is not allowed for {1}")]
    MethodNotAllowed(Method, Uri),
    #[error("Request timed out")]
    RequestTimeout,
    #[error("Invalid path parameter: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("Incoming form rejected: {0}")]
    MultipartRejection(#[from] MultipartRejection),
    #[error("Incoming form could not be read: {0}")]
    Multipart(#[from] MultipartError),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error("Subreddit with id {0} does not exist.")]
    UnknownSubreddit(Id<SubredditMarker>),
    #[error("Subreddit already exists")]
    SubredditAlreadyExists,
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("Subreddit with id {0} was not found.")]
    SubredditByIdNotFound(Id<SubredditMarker>),
    #[error(transparent)]
    Database(DbError),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error("Request task failed: {0}")]
    Task(#[from] JoinError),
    #[error("Middleware failed: {0}")]
    Middleware(BoxError),
}

impl From<DbError> for ServerError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::UnknownSubreddit(id) => ServerError::UnknownSubreddit(id),
            other => ServerError::Database(other),
        }
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::SubredditByIdNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::MethodNotAllowed(..) => StatusCode::METHOD_NOT_ALLOWED,
            ServerError::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            ServerError::JsonRejection(rejection) => body_status(rejection.status()),
            ServerError::MultipartRejection(rejection) => body_status(rejection.status()),
            ServerError::Multipart(err) => body_status(err.status()),
            ServerError::PathRejection(_)
            | ServerError::Draft(_)
            | ServerError::UnknownSubreddit(_) => StatusCode::BAD_REQUEST,
            ServerError::SubredditAlreadyExists => StatusCode::CONFLICT,
            ServerError::JsonResponse(_)
            | ServerError::Database(_)
            | ServerError::Media(_)
            | ServerError::Task(_)
            | ServerError::Middleware(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Unreadable bodies are the client's fault, unless they were too large.
fn body_status(status: StatusCode) -> StatusCode {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        status
    } else {
        StatusCode::BAD_REQUEST
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Server-side details stay in the logs.
        let error = if status.is_server_error() {
            error!(error = %self, %status, "Replying with error");
            INTERNAL_ERROR_MESSAGE.to_owned()
        } else {
            debug!(error = %self, %status, "Rejecting request");
            self.to_string()
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}
