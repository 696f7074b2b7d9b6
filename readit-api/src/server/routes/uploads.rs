use crate::{
    media::{MediaHost, UPLOAD_FOLDER},
    server::{
        Result, ServerError, ServerRouter,
        form::{Form, ImageUploadDraft},
        json::Json,
    },
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use readit_common::validation::Draft;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_post(upload_image)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/upload", rejection(ServerError))]
struct UploadPath();

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
struct UploadResponse {
    url: String,
}

async fn upload_image(
    UploadPath(): UploadPath,
    State(media): State<Arc<dyn MediaHost>>,
    Form(fields): Form,
) -> Result<Json<UploadResponse>> {
    let image = ImageUploadDraft::from(fields).validate()?;

    let uploaded = media.upload(image, UPLOAD_FOLDER).await?;
    info!(public_id = %uploaded.public_id, "Uploaded image");

    Ok(Json(UploadResponse { url: uploaded.url }))
}
