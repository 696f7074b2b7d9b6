//! Request bodies that arrive as `multipart/form-data`.

use crate::{
    media::MediaFile,
    server::{Result, ServerError, json::Json},
};
use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use readit_common::{
    model::subreddit::{SubredditDraft, SubredditName},
    validation::{Draft, DraftError, required_text},
};
use std::collections::HashMap;

/// Text and file fields of a multipart body, keyed by field name.
///
/// A file field with an empty body is treated as absent, which is what
/// browsers send for an unfilled file input.
#[derive(Clone, Debug, Default)]
pub struct FormFields {
    texts: HashMap<String, String>,
    files: HashMap<String, MediaFile>,
}

impl FormFields {
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut fields = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };

            if let Some(file_name) = field.file_name().map(str::to_owned) {
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    fields.files.insert(name, MediaFile { file_name, bytes });
                }
            } else {
                let text = field.text().await?;
                fields.texts.insert(name, text);
            }
        }

        Ok(fields)
    }

    pub fn take_text(&mut self, name: &str) -> Option<String> {
        self.texts.remove(name)
    }

    pub fn take_file(&mut self, name: &str) -> Option<MediaFile> {
        self.files.remove(name)
    }
}

/// Multipart body whose rejection is reported like every other client error.
pub struct Form(pub FormFields);

impl<S> FromRequest<S> for Form
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(request, state).await?;
        Ok(Self(FormFields::read(multipart).await?))
    }
}

/// A subreddit creation body, either JSON with optional asset URLs or a
/// multipart form carrying the icon and banner files themselves.
pub enum SubredditSubmission {
    Json(SubredditDraft),
    Upload(SubredditUploadDraft),
}

impl<S> FromRequest<S> for SubredditSubmission
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| {
                value
                    .trim_start()
                    .to_ascii_lowercase()
                    .starts_with("multipart/form-data")
            });

        if is_multipart {
            let Form(fields) = Form::from_request(request, state).await?;
            Ok(Self::Upload(SubredditUploadDraft::from(fields)))
        } else {
            let Json(draft) = Json::<SubredditDraft>::from_request(request, state).await?;
            Ok(Self::Json(draft))
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SubredditUploadDraft {
    pub name: Option<String>,
    pub icon: Option<MediaFile>,
    pub banner: Option<MediaFile>,
}

#[derive(Clone, Debug)]
pub struct SubredditUpload {
    pub name: SubredditName,
    pub icon: MediaFile,
    pub banner: MediaFile,
}

impl From<FormFields> for SubredditUploadDraft {
    fn from(mut fields: FormFields) -> Self {
        Self {
            name: fields.take_text("name"),
            icon: fields.take_file("icon"),
            banner: fields.take_file("banner"),
        }
    }
}

impl Draft for SubredditUploadDraft {
    type Output = SubredditUpload;
    const REQUIRED_FIELDS: &'static [&'static str] = &["name", "icon", "banner"];

    fn validate(self) -> Result<Self::Output, DraftError> {
        let (Some(name), Some(icon), Some(banner)) =
            (required_text(self.name), self.icon, self.banner)
        else {
            return Err(Self::missing());
        };

        Ok(SubredditUpload {
            name: SubredditName::new(name)?,
            icon,
            banner,
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct ImageUploadDraft {
    pub image: Option<MediaFile>,
}

impl From<FormFields> for ImageUploadDraft {
    fn from(mut fields: FormFields) -> Self {
        Self {
            image: fields.take_file("image"),
        }
    }
}

impl Draft for ImageUploadDraft {
    type Output = MediaFile;
    const REQUIRED_FIELDS: &'static [&'static str] = &["image"];

    fn validate(self) -> Result<Self::Output, DraftError> {
        self.image.ok_or_else(Self::missing)
    }
}
