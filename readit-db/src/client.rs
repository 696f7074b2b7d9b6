use crate::{
    MIGRATOR,
    record::{PostRecord, SubredditRecord},
    store::ForumStore,
};
use async_trait::async_trait;
use readit_common::model::{
    Id, ModelValidationError,
    post::{CreatePost, Post, PostMarker},
    subreddit::{CreateSubreddit, Subreddit, SubredditMarker, SubredditName},
};
use sqlx::{
    PgPool, query, query_as,
    migrate::MigrateError,
    postgres::{PgConnectOptions, PgPoolOptions},
};
use std::{str::FromStr, time::Duration};
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Subreddit with id {0} does not exist.")]
    UnknownSubreddit(Id<SubredditMarker>),
    #[error("Applying migrations failed: {0}")]
    Migrate(#[from] MigrateError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct DbOptions {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub statement_timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct DbClient {
    pool: PgPool,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool whose connections carry a server-side `statement_timeout`.
    pub async fn connect(options: &DbOptions) -> Result<Self> {
        let connect_options = PgConnectOptions::from_str(&options.url)?.options([(
            "statement_timeout",
            options.statement_timeout.as_millis().to_string(),
        )]);

        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect_with(connect_options)
            .await?;

        Ok(Self::new(pool))
    }

    /// Applies pending migrations. Safe to call on an up-to-date schema.
    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn unknown_subreddit(err: sqlx::Error, subreddit_id: Id<SubredditMarker>) -> DbError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            DbError::UnknownSubreddit(subreddit_id)
        }
        _ => err.into(),
    }
}

#[async_trait]
impl ForumStore for DbClient {
    async fn fetch_posts(&self) -> Result<Vec<Post>> {
        let records = query_as::<_, PostRecord>(
            "
            SELECT
                posts.id,
                posts.title,
                posts.body,
                posts.subreddit_id,
                subreddits.name AS subreddit,
                posts.upvotes,
                posts.image,
                posts.created_at
            FROM
                posts JOIN subreddits ON subreddits.id = posts.subreddit_id
            ORDER BY
                posts.created_at DESC, posts.id DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?;
        Ok(posts)
    }

    async fn fetch_subreddit_posts(&self, subreddit: &SubredditName) -> Result<Vec<Post>> {
        let records = query_as::<_, PostRecord>(
            "
            SELECT
                posts.id,
                posts.title,
                posts.body,
                posts.subreddit_id,
                subreddits.name AS subreddit,
                posts.upvotes,
                posts.image,
                posts.created_at
            FROM
                posts JOIN subreddits ON subreddits.id = posts.subreddit_id
            WHERE
                subreddits.name = $1
            ORDER BY
                posts.created_at DESC, posts.id DESC
            ",
        )
        .bind(subreddit.get())
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?;
        Ok(posts)
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(
            "
            SELECT
                posts.id,
                posts.title,
                posts.body,
                posts.subreddit_id,
                subreddits.name AS subreddit,
                posts.upvotes,
                posts.image,
                posts.created_at
            FROM
                posts JOIN subreddits ON subreddits.id = posts.subreddit_id
            WHERE
                posts.id = $1
            ",
        )
        .bind(post_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let record = query_as::<_, PostRecord>(
            "
            WITH inserted AS (
                INSERT INTO posts (title, body, subreddit_id, image)
                VALUES ($1, $2, $3, $4)
                RETURNING id, title, body, subreddit_id, upvotes, image, created_at
            )
            SELECT
                inserted.id,
                inserted.title,
                inserted.body,
                inserted.subreddit_id,
                subreddits.name AS subreddit,
                inserted.upvotes,
                inserted.image,
                inserted.created_at
            FROM
                inserted JOIN subreddits ON subreddits.id = inserted.subreddit_id
            ",
        )
        .bind(&post.title)
        .bind(&post.body)
        .bind(post.subreddit_id.get())
        .bind(post.image.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| unknown_subreddit(err, post.subreddit_id))?;

        Ok(Post::try_from(record)?)
    }

    async fn upvote_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(
            "
            WITH updated AS (
                UPDATE posts
                SET upvotes = upvotes + 1
                WHERE id = $1
                RETURNING id, title, body, subreddit_id, upvotes, image, created_at
            )
            SELECT
                updated.id,
                updated.title,
                updated.body,
                updated.subreddit_id,
                subreddits.name AS subreddit,
                updated.upvotes,
                updated.image,
                updated.created_at
            FROM
                updated JOIN subreddits ON subreddits.id = updated.subreddit_id
            ",
        )
        .bind(post_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<u64> {
        let result = query("DELETE FROM posts WHERE id = $1")
            .bind(post_id.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn fetch_subreddits(&self) -> Result<Vec<Subreddit>> {
        let records = query_as::<_, SubredditRecord>(
            "
            SELECT
                subreddits.id,
                subreddits.name,
                subreddits.icon,
                subreddits.banner,
                subreddits.created_at
            FROM
                subreddits
            ORDER BY
                subreddits.created_at DESC, subreddits.id DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let subreddits = records
            .into_iter()
            .map(Subreddit::try_from)
            .collect::<Result<_, _>>()?;
        Ok(subreddits)
    }

    async fn create_subreddit(&self, subreddit: &CreateSubreddit) -> Result<Option<Subreddit>> {
        // A conflicting name inserts nothing and returns no row.
        let record = query_as::<_, SubredditRecord>(
            "
            INSERT INTO subreddits (name, icon, banner)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO NOTHING
            RETURNING id, name, icon, banner, created_at
            ",
        )
        .bind(subreddit.name.get())
        .bind(subreddit.icon.as_deref())
        .bind(subreddit.banner.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        let subreddit = record.map(Subreddit::try_from).transpose()?;
        Ok(subreddit)
    }

    async fn delete_subreddit(&self, subreddit_id: Id<SubredditMarker>) -> Result<u64> {
        let result = query("DELETE FROM subreddits WHERE id = $1")
            .bind(subreddit_id.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
