use crate::db_pool::DbPool;

// `id INTEGER PRIMARY KEY` aliases the rowid, so an insert without an id gets max(id) + 1
pub const RECORDS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY,
    type TEXT NOT NULL,
    name TEXT,
    organization TEXT,
    date TEXT NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    size TEXT NOT NULL,
    color TEXT NOT NULL,
    tubeId TEXT,
    locationDescription TEXT,
    notes TEXT,

    -- JSON array of photo entries
    photos TEXT NOT NULL DEFAULT '[]'
)
"#;

pub const PHOTOS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS photos (
    uri TEXT PRIMARY KEY NOT NULL,
    photo BLOB NOT NULL
)
"#;

pub const SCHEMA_SQL: &[&str] = &[
    RECORDS_TABLE,
    "CREATE INDEX IF NOT EXISTS idx_records_date ON records(date);",
    PHOTOS_TABLE,
];

pub async fn initialize_schema(pool: &DbPool) -> Result<(), sqlx::Error> {
    for sql in SCHEMA_SQL {
        sqlx::query(sql).execute(pool).await?;
    }
    Ok(())
}
