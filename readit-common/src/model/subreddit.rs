use crate::{
    model::Id,
    validation::{Draft, DraftError, optional_text, required_text},
};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;
use time::OffsetDateTime;

pub const SUBREDDIT_NAME_MAX_LEN: usize = 50;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct SubredditMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Subreddit {
    pub id: Id<SubredditMarker>,
    pub name: SubredditName,
    pub icon: Option<String>,
    pub banner: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct CreateSubreddit {
    pub name: SubredditName,
    pub icon: Option<String>,
    pub banner: Option<String>,
}

/// JSON body of a subreddit creation request.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct SubredditDraft {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub banner: Option<String>,
}

impl Draft for SubredditDraft {
    type Output = CreateSubreddit;
    const REQUIRED_FIELDS: &'static [&'static str] = &["name"];

    fn validate(self) -> Result<Self::Output, DraftError> {
        let Some(name) = required_text(self.name) else {
            return Err(Self::missing());
        };

        Ok(CreateSubreddit {
            name: SubredditName::new(name)?,
            icon: optional_text(self.icon),
            banner: optional_text(self.banner),
        })
    }
}

/// Trimmed, non-empty subreddit name of bounded length.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct SubredditName(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The subreddit name is invalid: {0:?}")]
pub struct InvalidSubredditNameError(String);

impl SubredditName {
    pub fn new(name: String) -> Result<Self, InvalidSubredditNameError> {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.chars().count() > SUBREDDIT_NAME_MAX_LEN {
            return Err(InvalidSubredditNameError(name));
        }

        if trimmed.len() == name.len() {
            Ok(SubredditName(name))
        } else {
            Ok(SubredditName(trimmed.to_owned()))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for SubredditName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        SubredditName::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"SubredditName"))
    }
}
