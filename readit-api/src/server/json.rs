//! JSON bodies in both directions. Rejections go through [`ServerError`] so
//! malformed input gets the same `{error}` body as every other failure.

use crate::server::ServerError;
use axum::{
    Json as AxumJson,
    extract::FromRequest,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::TypedHeader;
use headers::ContentType;
use serde::Serialize;

#[derive(FromRequest, Debug, Clone, Copy, Default)]
#[from_request(via(AxumJson), rejection(ServerError))]
pub struct Json<T>(pub T);

/// Newly created row, answered with `201 Created`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Created<T>(pub T);

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(json) => (status, TypedHeader(ContentType::json()), json).into_response(),
        Err(err) => ServerError::JsonResponse(err).into_response(),
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        json_response(StatusCode::OK, &self.0)
    }
}

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        json_response(StatusCode::CREATED, &self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::CONTENT_TYPE;
    use serde_json::json;

    #[test]
    fn created_sets_status_and_content_type() {
        let response = Created(json!({"id": 1})).into_response();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn status_tuple_overrides_ok() {
        let response = (StatusCode::CONFLICT, Json(json!({"error": "x"}))).into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
