use crate::engine::GraphError;
use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use serde_json::json;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("bad request")]
    BadRequest(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::Graph(e) if e.is_internal() => {
                log::error!("Internal graph error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            Error::Graph(e @ GraphError::UnknownTemplate(_)) => (StatusCode::NOT_FOUND, e.to_string()),
            Error::Graph(
                e @ (GraphError::Snapshot(_)
                | GraphError::MalformedSnapshot(_)
                | GraphError::InvalidDataset(_)
                | GraphError::InvalidParameter { .. }),
            ) => (StatusCode::BAD_REQUEST, e.to_string()),
            Error::Graph(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
