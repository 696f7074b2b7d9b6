use crate::server::ServerRouter;
use axum::Router;

mod posts;
mod subreddits;
mod uploads;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(posts::routes())
        .merge(subreddits::routes())
        .merge(uploads::routes())
}
