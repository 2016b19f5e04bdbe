use serde::Deserialize;
use warp::{Filter, Rejection, Reply};

use crate::db_pool::DbPool;
use crate::models::{NewRecord, Record};
use crate::record_store::{default_before, DEFAULT_LIST_LIMIT};
use crate::warp_helpers::{reject_store_error, with_db};

// Record bodies are small; anything larger is not a record
const MAX_RECORD_BODY_BYTES: u64 = 64 * 1024;

#[derive(Debug, Deserialize)]
pub struct RecordQuery {
    pub limit: Option<u32>,
    pub before: Option<String>,
}

pub async fn list_records(query: RecordQuery, db_pool: DbPool) -> Result<impl Reply, Rejection> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let before = query.before.unwrap_or_else(default_before);

    log::debug!("Listing up to {} records before {}", limit, before);

    let records = Record::list(&db_pool, &before, limit)
        .await
        .map_err(reject_store_error)?;

    Ok(warp::reply::json(&records))
}

pub async fn create_record(record: NewRecord, db_pool: DbPool) -> Result<impl Reply, Rejection> {
    let record = Record::create(&db_pool, record)
        .await
        .map_err(reject_store_error)?;

    Ok(warp::reply::json(&record))
}

pub fn build_record_routes(
    db_pool: DbPool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let list = warp::path!("api" / "records")
        .and(warp::get())
        .and(warp::query::<RecordQuery>())
        .and(with_db(db_pool.clone()))
        .and_then(list_records);

    let create = warp::path!("api" / "records")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_RECORD_BODY_BYTES))
        .and(warp::body::json::<NewRecord>())
        .and(with_db(db_pool))
        .and_then(create_record);

    list.or(create)
}
