use bytes::Bytes;
use warp::{reject, Filter, Rejection, Reply};

use crate::db_pool::DbPool;
use crate::photo_store::{attach_photo, get_photo, PHOTO_CONTENT_TYPE};
use crate::warp_helpers::{reject_store_error, with_db, NotFoundError};

pub async fn upload_photo(
    record_id: i64,
    body: Bytes,
    db_pool: DbPool,
) -> Result<impl Reply, Rejection> {
    log::debug!(
        "Photo upload for record {} ({} bytes)",
        record_id,
        body.len()
    );

    attach_photo(&db_pool, record_id, &body)
        .await
        .map_err(reject_store_error)?;

    Ok(warp::reply())
}

/// Serves `/api/blob/{uri}.jpg`; the `.jpg` suffix is part of the route, not the URI.
pub async fn get_photo_blob(file_name: String, db_pool: DbPool) -> Result<impl Reply, Rejection> {
    let Some(uri) = file_name.strip_suffix(".jpg") else {
        return Err(reject::custom(NotFoundError {
            message: format!("Photo {} not found", file_name),
        }));
    };

    let data = get_photo(&db_pool, uri).await.map_err(reject_store_error)?;

    let reply = warp::reply::with_header(data, "content-type", PHOTO_CONTENT_TYPE);
    // Blobs never change once written
    let reply = warp::reply::with_header(reply, "cache-control", "public, max-age=31536000");

    Ok(reply)
}

pub fn build_photo_routes(
    db_pool: DbPool,
    max_photo_bytes: u64,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let upload = warp::path!("api" / "records" / i64 / "photo")
        .and(warp::post())
        .and(warp::body::content_length_limit(max_photo_bytes))
        .and(warp::body::bytes())
        .and(with_db(db_pool.clone()))
        .and_then(upload_photo);

    let blob = warp::path!("api" / "blob" / String)
        .and(warp::get())
        .and(with_db(db_pool))
        .and_then(get_photo_blob);

    upload.or(blob)
}
