use log::{error, info};
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;
use sqlx::{FromRow, Row, SqliteConnection};
use std::str::FromStr;

use crate::db_pool::DbPool;
use crate::error::{StoreError, StoreResult};
use crate::models::{NewRecord, PhotoEntry, Record};

pub const DEFAULT_LIST_LIMIT: u32 = 20;

const RECORD_COLUMNS: &str = "id, type, name, organization, date, latitude, longitude, \
     size, color, tubeId, locationDescription, notes, photos";

impl<'r> FromRow<'r, SqliteRow> for Record {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let Json(photos) = row.try_get::<Json<Vec<PhotoEntry>>, _>("photos")?;

        Ok(Record {
            id: row.try_get("id")?,
            record_type: parse_column(row, "type")?,
            name: row.try_get("name")?,
            organization: row.try_get("organization")?,
            date: row.try_get("date")?,
            longitude: row.try_get("longitude")?,
            latitude: row.try_get("latitude")?,
            size: parse_column(row, "size")?,
            color: parse_column(row, "color")?,
            tube_id: row.try_get("tubeId")?,
            location_description: row.try_get("locationDescription")?,
            notes: row.try_get("notes")?,
            photos,
        })
    }
}

fn parse_column<T>(row: &SqliteRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e: T::Err| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

/// Cutoff used when a listing doesn't give one: tomorrow, so today's records are included.
pub fn default_before() -> String {
    (chrono::Local::now() + chrono::Duration::days(1))
        .format("%Y-%m-%d")
        .to_string()
}

impl Record {
    /// Persists a client record and returns it with its assigned id.
    ///
    /// The id comes from the insert itself (`INTEGER PRIMARY KEY` takes max(id) + 1),
    /// so two overlapping creates can never be handed the same one. The insert is the
    /// transaction's first statement, so a concurrent create waits for the write lock.
    pub async fn create(pool: &DbPool, new_record: NewRecord) -> StoreResult<Record> {
        new_record.validate().map_err(StoreError::Validation)?;

        let photos = new_record.uploaded_photos();
        if photos.is_empty() && new_record.photos.as_ref().is_some_and(|p| !p.is_empty()) {
            info!(
                "Discarding {} cached photo placeholders for record dated {}",
                new_record.photos.as_ref().map_or(0, Vec::len),
                new_record.date
            );
        }

        let mut tx = pool.begin().await?;
        match insert_record(&mut tx, &new_record, &photos).await {
            Ok(id) => {
                tx.commit().await?;
                info!("New record ID: {}", id);
                Ok(Record::from_new(id, new_record, photos))
            }
            Err(e) => {
                info!(
                    "Rolling back transaction for record dated {}",
                    new_record.date
                );
                if let Err(rollback_err) = tx.rollback().await {
                    error!("Rollback failed: {}", rollback_err);
                }
                error!("Error creating record: {}", e);
                Err(e.into())
            }
        }
    }

    /// Records dated strictly before `before`, newest first, at most `limit` of them.
    pub async fn list(pool: &DbPool, before: &str, limit: u32) -> StoreResult<Vec<Record>> {
        let sql = format!(
            "SELECT {} FROM records WHERE date < ? ORDER BY date DESC, id DESC LIMIT ?",
            RECORD_COLUMNS
        );

        let records = sqlx::query_as::<_, Record>(&sql)
            .bind(before)
            .bind(i64::from(limit))
            .fetch_all(pool)
            .await?;

        Ok(records)
    }

    pub async fn find_by_id(pool: &DbPool, id: i64) -> StoreResult<Option<Record>> {
        let sql = format!("SELECT {} FROM records WHERE id = ?", RECORD_COLUMNS);

        let record = sqlx::query_as::<_, Record>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(record)
    }
}

async fn insert_record(
    conn: &mut SqliteConnection,
    record: &NewRecord,
    photos: &[PhotoEntry],
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO records
            (type, name, organization, date, latitude, longitude,
             size, color, tubeId, locationDescription, notes, photos)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING id",
    )
    .bind(record.record_type.as_str())
    .bind(record.name.as_deref())
    .bind(record.organization.as_deref())
    .bind(&record.date)
    .bind(record.latitude)
    .bind(record.longitude)
    .bind(record.size.as_str())
    .bind(record.color.as_str())
    .bind(record.tube_id.as_deref())
    .bind(record.location_description.as_deref())
    .bind(record.notes.as_deref())
    .bind(Json(photos))
    .fetch_one(conn)
    .await
}

/// Photo list stored on one record, read through the caller's connection or transaction.
pub async fn load_photos(conn: &mut SqliteConnection, record_id: i64) -> StoreResult<Vec<PhotoEntry>> {
    let photos: Option<Json<Vec<PhotoEntry>>> =
        sqlx::query_scalar("SELECT photos FROM records WHERE id = ?")
            .bind(record_id)
            .fetch_optional(conn)
            .await?;

    photos
        .map(|Json(photos)| photos)
        .ok_or_else(|| StoreError::NotFound(format!("Record {}", record_id)))
}

pub async fn store_photos(
    conn: &mut SqliteConnection,
    record_id: i64,
    photos: &[PhotoEntry],
) -> StoreResult<()> {
    let result = sqlx::query("UPDATE records SET photos = ? WHERE id = ?")
        .bind(Json(photos))
        .bind(record_id)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!("Record {}", record_id)));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db_pool::create_in_memory_pool;
    use crate::models::{AlgaeColor, AlgaeSize, AlgaeType};

    fn sighting(date: &str) -> NewRecord {
        NewRecord {
            record_type: AlgaeType::Sighting,
            name: None,
            organization: None,
            date: date.to_string(),
            longitude: 2.0,
            latitude: 1.0,
            size: AlgaeSize::Fist,
            color: AlgaeColor::Green,
            tube_id: None,
            location_description: None,
            notes: None,
            photos: None,
        }
    }

    fn photo(uri: &str, size: Option<u64>) -> PhotoEntry {
        PhotoEntry {
            uri: uri.to_string(),
            width: 640,
            height: 480,
            size,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let pool = create_in_memory_pool().await.unwrap();

        for expected in 1..=5 {
            let record = Record::create(&pool, sighting("2023-01-01")).await.unwrap();
            assert_eq!(record.id, expected);
        }
    }

    #[tokio::test]
    async fn test_create_returns_persisted_record() {
        let pool = create_in_memory_pool().await.unwrap();

        let mut new_record = sighting("2023-02-14");
        new_record.record_type = AlgaeType::Sample;
        new_record.name = Some("Ana".to_string());
        new_record.organization = Some("Snow Lab".to_string());
        new_record.size = AlgaeSize::SportsField;
        new_record.color = AlgaeColor::Orange;
        new_record.tube_id = Some("LS-001".to_string());
        new_record.location_description = Some("below the col".to_string());
        new_record.notes = Some("patchy".to_string());

        let created = Record::create(&pool, new_record).await.unwrap();
        let stored = Record::find_by_id(&pool, created.id).await.unwrap().unwrap();

        assert_eq!(stored, created);
        assert_eq!(stored.size, AlgaeSize::SportsField);
        assert_eq!(stored.tube_id.as_deref(), Some("LS-001"));
    }

    #[tokio::test]
    async fn test_create_discards_sizeless_photos() {
        let pool = create_in_memory_pool().await.unwrap();

        let mut new_record = sighting("2023-01-01");
        new_record.photos = Some(vec![
            photo("file:///cache/1.jpg", None),
            photo("file:///cache/2.jpg", None),
        ]);

        let created = Record::create(&pool, new_record).await.unwrap();
        assert!(created.photos.is_empty());

        let stored = Record::find_by_id(&pool, created.id).await.unwrap().unwrap();
        assert!(stored.photos.is_empty());
    }

    #[tokio::test]
    async fn test_create_keeps_photos_with_size() {
        let pool = create_in_memory_pool().await.unwrap();

        let photos = vec![photo("file:///cache/1.jpg", None), photo("12", Some(307200))];
        let mut new_record = sighting("2023-01-01");
        new_record.photos = Some(photos.clone());

        let created = Record::create(&pool, new_record).await.unwrap();
        let stored = Record::find_by_id(&pool, created.id).await.unwrap().unwrap();

        assert_eq!(stored.photos, photos);
    }

    #[tokio::test]
    async fn test_create_rejects_too_many_photos() {
        let pool = create_in_memory_pool().await.unwrap();

        let mut new_record = sighting("2023-01-01");
        new_record.photos = Some((1..=5).map(|i| photo(&i.to_string(), Some(1))).collect());

        let result = Record::create(&pool, new_record).await;
        assert!(matches!(result, Err(StoreError::Validation(_))));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_list_filters_and_orders_by_date() {
        let pool = create_in_memory_pool().await.unwrap();

        for date in ["2023-01-03", "2023-01-01", "2023-01-05", "2023-01-02", "2023-01-04"] {
            Record::create(&pool, sighting(date)).await.unwrap();
        }

        let records = Record::list(&pool, "2023-01-04", 10).await.unwrap();
        let dates: Vec<&str> = records.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2023-01-03", "2023-01-02", "2023-01-01"]);

        let limited = Record::list(&pool, "2023-12-31", 2).await.unwrap();
        let dates: Vec<&str> = limited.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2023-01-05", "2023-01-04"]);

        let none = Record::list(&pool, "2023-01-01", 10).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_list_same_date_newest_id_first() {
        let pool = create_in_memory_pool().await.unwrap();

        Record::create(&pool, sighting("2023-01-01")).await.unwrap();
        Record::create(&pool, sighting("2023-01-01")).await.unwrap();

        let records = Record::list(&pool, "2023-01-02", 10).await.unwrap();
        let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_list_default_cutoff_includes_today() {
        let pool = create_in_memory_pool().await.unwrap();

        let today = chrono::Local::now().format("%Y-%m-%d").to_string();
        Record::create(&pool, sighting(&today)).await.unwrap();

        let records = Record::list(&pool, &default_before(), DEFAULT_LIST_LIMIT)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_list_rejects_corrupt_photo_column() {
        let pool = create_in_memory_pool().await.unwrap();

        let created = Record::create(&pool, sighting("2023-01-01")).await.unwrap();
        sqlx::query("UPDATE records SET photos = '[{\"uri\": 5}]' WHERE id = ?")
            .bind(created.id)
            .execute(&pool)
            .await
            .unwrap();

        let result = Record::list(&pool, "2024-01-01", 10).await;
        assert!(matches!(result, Err(StoreError::Database(_))));
    }

    #[tokio::test]
    async fn test_load_photos_missing_record() {
        let pool = create_in_memory_pool().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let result = load_photos(&mut conn, 42).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_get_distinct_ids() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("records.db");
        let pool = crate::db_pool::create_db_pool(db_path.to_str().unwrap(), 4)
            .await
            .unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let pool = pool.clone();
                tokio::spawn(async move { Record::create(&pool, sighting("2023-01-01")).await })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }
        ids.sort();
        assert_eq!(ids, (1..=16).collect::<Vec<i64>>());
    }
}
