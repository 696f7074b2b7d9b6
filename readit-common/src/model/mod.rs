pub mod post;
pub mod subreddit;

use crate::model::subreddit::InvalidSubredditNameError;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    SubredditName(#[from] InvalidSubredditNameError),
    #[error("Upvote count was negative: {0}")]
    NegativeUpvotes(i64),
}

/// Store-generated row id, tagged with the entity it belongs to.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id<Marker>(i64, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self(id, PhantomData)
    }

    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<i64> for Id<Marker> {
    fn from(value: i64) -> Self {
        Id::new(value)
    }
}

impl<Marker> From<Id<Marker>> for i64 {
    fn from(value: Id<Marker>) -> Self {
        value.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::post::PostMarker;

    #[test]
    fn id_is_a_bare_json_number() {
        let id = Id::<PostMarker>::new(42);

        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        assert_eq!(serde_json::from_str::<Id<PostMarker>>("42").unwrap(), id);
        assert!(serde_json::from_str::<Id<PostMarker>>("\"abc\"").is_err());
    }

    #[test]
    fn id_displays_inner_value() {
        assert_eq!(Id::<PostMarker>::from(7).to_string(), "7");
    }
}
