use log::{error, info};
use sqlx::SqliteConnection;

use crate::db_pool::DbPool;
use crate::error::{StoreError, StoreResult};
use crate::models::{PhotoEntry, MAX_PHOTOS};
use crate::record_store::{load_photos, store_photos};

/// Content type every stored blob is served with.
pub const PHOTO_CONTENT_TYPE: &str = "image/jpeg";

/// Width and height of an encoded image, failing on bytes that don't decode.
pub fn decode_dimensions(data: &[u8]) -> StoreResult<(u32, u32)> {
    let image = image::load_from_memory(data)?;
    Ok((image.width(), image.height()))
}

/// Stores `data` as a new blob and appends its entry to the record's photo list.
///
/// Both writes share one transaction: either the record references a blob that
/// exists, or neither changed. Returns the record's updated photo list.
pub async fn attach_photo(
    pool: &DbPool,
    record_id: i64,
    data: &[u8],
) -> StoreResult<Vec<PhotoEntry>> {
    let (width, height) = decode_dimensions(data).inspect_err(|e| {
        error!("Rejecting photo for record {}: {}", record_id, e);
    })?;

    let mut tx = pool.begin().await?;
    match append_photo(&mut tx, record_id, data, width, height).await {
        Ok(photos) => {
            tx.commit().await?;
            Ok(photos)
        }
        Err(e) => {
            info!(
                "Rolling back transaction for photo belonging to record {}",
                record_id
            );
            if let Err(rollback_err) = tx.rollback().await {
                error!("Rollback failed: {}", rollback_err);
            }
            Err(e)
        }
    }
}

// The blob insert must stay the first statement: it takes the write lock before any
// read, so a concurrent attach waits on the busy timeout instead of failing on a
// stale WAL snapshot.
async fn append_photo(
    conn: &mut SqliteConnection,
    record_id: i64,
    data: &[u8],
    width: u32,
    height: u32,
) -> StoreResult<Vec<PhotoEntry>> {
    let uri = insert_blob(conn, data).await?;

    let mut photos = load_photos(conn, record_id).await?;
    if photos.len() >= MAX_PHOTOS {
        return Err(StoreError::Validation(format!(
            "record {} already has {} photos",
            record_id, MAX_PHOTOS
        )));
    }

    info!("New photo URI {} for record {}", uri, record_id);

    // Pixel count, not byte count, for server-issued photos
    photos.push(PhotoEntry {
        uri,
        width,
        height,
        size: Some(u64::from(width) * u64::from(height)),
    });
    store_photos(conn, record_id, &photos).await?;

    Ok(photos)
}

// The next URI is computed in the insert itself; non-numeric URIs cast to 0.
async fn insert_blob(conn: &mut SqliteConnection, data: &[u8]) -> Result<String, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "INSERT INTO photos (uri, photo)
         SELECT CAST(COALESCE(MAX(CAST(uri AS INTEGER)), 0) + 1 AS TEXT), ?
         FROM photos
         RETURNING uri",
    )
    .bind(data)
    .fetch_one(conn)
    .await
}

pub async fn get_photo(pool: &DbPool, uri: &str) -> StoreResult<Vec<u8>> {
    let photo: Option<Vec<u8>> = sqlx::query_scalar("SELECT photo FROM photos WHERE uri = ?")
        .bind(uri)
        .fetch_optional(pool)
        .await?;

    photo.ok_or_else(|| StoreError::NotFound(format!("Photo {}", uri)))
}
