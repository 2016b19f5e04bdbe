use serde::Serialize;
use std::convert::Infallible;

use warp::{reject, Filter, Rejection, Reply};

use crate::db_pool::DbPool;
use crate::error::StoreError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    pub timestamp: String,
}

#[derive(Debug)]
pub struct DatabaseError {
    pub message: String,
}

impl reject::Reject for DatabaseError {}

#[derive(Debug)]
pub struct NotFoundError {
    pub message: String,
}

impl reject::Reject for NotFoundError {}

#[derive(Debug)]
pub struct ValidationError {
    pub message: String,
}

impl reject::Reject for ValidationError {}

#[derive(Debug)]
pub struct InvalidImageError {
    pub message: String,
}

impl reject::Reject for InvalidImageError {}

pub fn with_db(db_pool: DbPool) -> impl Filter<Extract = (DbPool,), Error = Infallible> + Clone {
    warp::any().map(move || db_pool.clone())
}

/// Maps a store failure onto the rejection that carries its HTTP status.
pub fn reject_store_error(err: StoreError) -> Rejection {
    match err {
        StoreError::Validation(message) => {
            log::warn!("Validation failed: {}", message);
            reject::custom(ValidationError { message })
        }
        StoreError::NotFound(what) => {
            log::warn!("{} not found", what);
            reject::custom(NotFoundError {
                message: format!("{} not found", what),
            })
        }
        StoreError::Decode(e) => {
            log::error!("Invalid image data: {}", e);
            reject::custom(InvalidImageError {
                message: format!("Invalid image data: {}", e),
            })
        }
        StoreError::Database(e) => {
            log::error!("Database error: {}", e);
            reject::custom(DatabaseError {
                message: format!("Database error: {}", e),
            })
        }
    }
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message;
    let timestamp = chrono::Utc::now().to_rfc3339();

    if err.is_not_found() {
        code = warp::http::StatusCode::NOT_FOUND;
        message = "Not Found".to_string();
    } else if let Some(database_error) = err.find::<DatabaseError>() {
        code = warp::http::StatusCode::INTERNAL_SERVER_ERROR;
        message = database_error.message.clone();
    } else if let Some(not_found) = err.find::<NotFoundError>() {
        code = warp::http::StatusCode::NOT_FOUND;
        message = not_found.message.clone();
    } else if let Some(validation_error) = err.find::<ValidationError>() {
        code = warp::http::StatusCode::UNPROCESSABLE_ENTITY;
        message = validation_error.message.clone();
    } else if let Some(body_error) = err.find::<warp::filters::body::BodyDeserializeError>() {
        code = warp::http::StatusCode::UNPROCESSABLE_ENTITY;
        message = body_error.to_string();
    } else if let Some(image_error) = err.find::<InvalidImageError>() {
        code = warp::http::StatusCode::BAD_REQUEST;
        message = image_error.message.clone();
    } else if let Some(query_error) = err.find::<warp::reject::InvalidQuery>() {
        code = warp::http::StatusCode::BAD_REQUEST;
        message = query_error.to_string();
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        code = warp::http::StatusCode::PAYLOAD_TOO_LARGE;
        message = "Payload too large".to_string();
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        code = warp::http::StatusCode::LENGTH_REQUIRED;
        message = "Content-Length required".to_string();
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        code = warp::http::StatusCode::UNSUPPORTED_MEDIA_TYPE;
        message = "Unsupported media type".to_string();
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        code = warp::http::StatusCode::METHOD_NOT_ALLOWED;
        message = "Method not allowed".to_string();
    } else {
        log::error!("Unhandled rejection: {:?}", err);
        code = warp::http::StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal server error".to_string();
    }

    let error_response = ErrorResponse {
        error: message,
        code: code.as_u16(),
        timestamp,
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&error_response),
        code,
    ))
}

pub fn cors() -> warp::cors::Builder {
    warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use warp::http::StatusCode;

    async fn status_of(err: StoreError) -> StatusCode {
        handle_rejection(reject_store_error(err))
            .await
            .unwrap()
            .into_response()
            .status()
    }

    #[tokio::test]
    async fn test_store_errors_map_to_status_codes() {
        assert_eq!(
            status_of(StoreError::Validation("too many photos".to_string())).await,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(StoreError::NotFound("Photo 9".to_string())).await,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(StoreError::Database(sqlx::Error::RowNotFound)).await,
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let decode_error = image::load_from_memory(b"nope").unwrap_err();
        assert_eq!(
            status_of(StoreError::Decode(decode_error)).await,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let reply = handle_rejection(warp::reject::not_found()).await.unwrap();
        assert_eq!(reply.into_response().status(), StatusCode::NOT_FOUND);
    }
}
