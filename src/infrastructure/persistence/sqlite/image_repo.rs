//! SQLite Image Repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::DbPool;
use crate::application::ports::{ImageRecord, ImageRepositoryPort, RepositoryError};

/// SQLite Image Repository
pub struct SqliteImageRepository {
    pool: DbPool,
}

impl SqliteImageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ImageRow {
    id: String,
    filename: String,
    filepath: String,
    url: String,
    prompt: String,
    seed: Option<i64>,
    source_image: Option<String>,
    model: String,
    settings: String,
    created_at: String,
}

impl TryFrom<ImageRow> for ImageRecord {
    type Error = RepositoryError;

    fn try_from(row: ImageRow) -> Result<Self, Self::Error> {
        Ok(ImageRecord {
            id: Uuid::parse_str(&row.id)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?,
            filename: row.filename,
            filepath: row.filepath,
            url: row.url,
            prompt: row.prompt,
            seed: row.seed,
            source_image: row.source_image,
            model: row.model,
            settings: serde_json::from_str(&row.settings)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?,
            created_at: DateTime::parse_from_rfc3339(&row.created_at)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?
                .with_timezone(&Utc),
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT id, filename, filepath, url, prompt, seed, source_image, model, settings, created_at FROM images";

#[async_trait]
impl ImageRepositoryPort for SqliteImageRepository {
    async fn save(&self, image: &ImageRecord) -> Result<(), RepositoryError> {
        let settings = serde_json::to_string(&image.settings)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO images (id, filename, filepath, url, prompt, seed, source_image, model, settings, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                filename = excluded.filename,
                filepath = excluded.filepath,
                url = excluded.url,
                prompt = excluded.prompt,
                seed = excluded.seed,
                source_image = excluded.source_image,
                model = excluded.model,
                settings = excluded.settings
            "#,
        )
        .bind(image.id.to_string())
        .bind(&image.filename)
        .bind(&image.filepath)
        .bind(&image.url)
        .bind(&image.prompt)
        .bind(image.seed)
        .bind(&image.source_image)
        .bind(&image.model)
        .bind(settings)
        .bind(image.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ImageRecord>, RepositoryError> {
        let row: Option<ImageRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(ImageRecord::try_from).transpose()
    }

    async fn find_all(&self) -> Result<Vec<ImageRecord>, RepositoryError> {
        let rows: Vec<ImageRow> =
            sqlx::query_as(&format!("{} ORDER BY created_at DESC, rowid DESC", SELECT_COLUMNS))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(ImageRecord::try_from).collect()
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM images WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}
