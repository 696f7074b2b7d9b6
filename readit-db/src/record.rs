use readit_common::model::{
    ModelValidationError,
    post::Post,
    subreddit::{Subreddit, SubredditName},
};
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct SubredditRecord {
    pub id: i64,
    pub name: String,
    pub icon: Option<String>,
    pub banner: Option<String>,
    pub created_at: OffsetDateTime,
}

/// A post row joined with the name of its subreddit.
#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub subreddit_id: i64,
    pub subreddit: String,
    pub upvotes: i64,
    pub image: Option<String>,
    pub created_at: OffsetDateTime,
}

impl TryFrom<SubredditRecord> for Subreddit {
    type Error = ModelValidationError;

    fn try_from(value: SubredditRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id.into(),
            name: SubredditName::new(value.name)?,
            icon: value.icon,
            banner: value.banner,
            created_at: value.created_at,
        })
    }
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id.into(),
            title: value.title,
            body: value.body,
            subreddit_id: value.subreddit_id.into(),
            subreddit: SubredditName::new(value.subreddit)?,
            upvotes: value
                .upvotes
                .try_into()
                .map_err(|_| ModelValidationError::NegativeUpvotes(value.upvotes))?,
            image: value.image,
            created_at: value.created_at,
        })
    }
}
