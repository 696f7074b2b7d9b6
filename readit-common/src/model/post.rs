use crate::{
    model::{
        Id,
        subreddit::{SubredditMarker, SubredditName},
    },
    validation::{Draft, DraftError, optional_text, required_text},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub title: String,
    pub body: String,
    pub subreddit_id: Id<SubredditMarker>,
    pub subreddit: SubredditName,
    pub upvotes: u64,
    pub image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct CreatePost {
    pub title: String,
    pub body: String,
    pub subreddit_id: Id<SubredditMarker>,
    pub image: Option<String>,
}

/// JSON body of a post creation request.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct PostDraft {
    pub title: Option<String>,
    pub body: Option<String>,
    #[serde(rename = "subredditId", alias = "subreddit_id")]
    pub subreddit_id: Option<Id<SubredditMarker>>,
    pub image: Option<String>,
}

impl Draft for PostDraft {
    type Output = CreatePost;
    const REQUIRED_FIELDS: &'static [&'static str] = &["title", "body", "subredditId"];

    fn validate(self) -> Result<Self::Output, DraftError> {
        let (Some(title), Some(body), Some(subreddit_id)) = (
            required_text(self.title),
            required_text(self.body),
            self.subreddit_id,
        ) else {
            return Err(Self::missing());
        };

        Ok(CreatePost {
            title,
            body,
            subreddit_id,
            image: optional_text(self.image),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_accepts_both_id_spellings() {
        let camel: PostDraft =
            serde_json::from_str(r#"{"title":"New","body":"Content","subredditId":1}"#).unwrap();
        let snake: PostDraft =
            serde_json::from_str(r#"{"title":"New","body":"Content","subreddit_id":1}"#).unwrap();

        assert_eq!(camel, snake);
        assert_eq!(camel.subreddit_id, Some(Id::new(1)));
    }

    #[test]
    fn draft_validates_into_create_post() {
        let draft = PostDraft {
            title: Some(" New ".to_owned()),
            body: Some("Content".to_owned()),
            subreddit_id: Some(Id::new(1)),
            image: None,
        };

        let post = draft.validate().unwrap();
        assert_eq!(post.title, "New");
        assert_eq!(post.body, "Content");
        assert_eq!(post.subreddit_id, Id::new(1));
        assert_eq!(post.image, None);
    }

    #[test]
    fn draft_missing_any_field_reports_all_required() {
        let drafts = [
            PostDraft {
                title: None,
                body: Some("Content".to_owned()),
                subreddit_id: Some(Id::new(1)),
                image: None,
            },
            PostDraft {
                title: Some("New".to_owned()),
                body: Some("   ".to_owned()),
                subreddit_id: Some(Id::new(1)),
                image: None,
            },
            PostDraft {
                title: Some("New".to_owned()),
                body: Some("Content".to_owned()),
                subreddit_id: None,
                image: None,
            },
        ];

        for draft in drafts {
            let err = draft.validate().unwrap_err();
            assert_eq!(err.to_string(), "title, body and subredditId are required");
        }
    }
}
