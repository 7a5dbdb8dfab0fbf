use sqlx::{error::ErrorKind, SqlitePool};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info};

use super::repo_types::{Item, ItemPatch, ListingFilter, NewItem};

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("invalid listing data: {0}")]
    InvalidListing(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

const SELECT_ITEM: &str = r#"
    SELECT id, date, seller_id, item_type, category, color, price, condition,
           name, description, orders, image_url, custom
    FROM item
"#;

/// Storage-level constraint failures become listing validation errors.
fn classify(err: sqlx::Error) -> ListingError {
    if let sqlx::Error::Database(db_err) = &err {
        let reason = match db_err.kind() {
            ErrorKind::CheckViolation => Some("price must be greater than 0"),
            ErrorKind::ForeignKeyViolation => Some("unknown seller"),
            ErrorKind::NotNullViolation => Some("missing required field"),
            _ => None,
        };
        if let Some(reason) = reason {
            return ListingError::InvalidListing(reason.into());
        }
    }
    ListingError::Database(err)
}

impl Item {
    /// Inserts a listing owned by `seller_id` and returns its id.
    pub async fn create(
        db: &SqlitePool,
        seller_id: i64,
        item: &NewItem,
    ) -> Result<i64, ListingError> {
        item.validate().map_err(ListingError::InvalidListing)?;

        let mut tx = db.begin().await?;
        let inserted = sqlx::query(
            r#"
            INSERT INTO item (date, seller_id, item_type, category, color, price,
                              condition, name, description, image_url, custom)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(OffsetDateTime::now_utc())
        .bind(seller_id)
        .bind(&item.item_type)
        .bind(&item.category)
        .bind(&item.color)
        .bind(item.price)
        .bind(&item.condition)
        .bind(&item.name)
        .bind(&item.description)
        .bind(&item.image_url)
        .bind(item.custom)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(res) => {
                tx.commit().await?;
                let id = res.last_insert_rowid();
                info!(item_id = id, seller_id, "listing created");
                Ok(id)
            }
            Err(e) => {
                tx.rollback().await?;
                Err(classify(e))
            }
        }
    }

    /// Full scan, newest first by rowid. No pagination.
    pub async fn list(db: &SqlitePool, filter: &ListingFilter) -> sqlx::Result<Vec<Item>> {
        let rows = sqlx::query_as::<_, Item>(&format!(
            r#"{SELECT_ITEM}
            WHERE (? IS NULL OR category = ?)
              AND (? IS NULL OR seller_id = ?)
            ORDER BY id DESC"#
        ))
        .bind(&filter.category)
        .bind(&filter.category)
        .bind(filter.seller_id)
        .bind(filter.seller_id)
        .fetch_all(db)
        .await?;
        debug!(count = rows.len(), ?filter, "listings fetched");
        Ok(rows)
    }

    pub async fn get(db: &SqlitePool, id: i64) -> sqlx::Result<Option<Item>> {
        sqlx::query_as::<_, Item>(&format!("{SELECT_ITEM} WHERE id = ?"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Merges `patch` into the stored row. Authorization is the caller's job.
    pub async fn update(
        db: &SqlitePool,
        id: i64,
        patch: &ItemPatch,
    ) -> Result<Option<Item>, ListingError> {
        patch.validate().map_err(ListingError::InvalidListing)?;

        let mut tx = db.begin().await?;
        let current = sqlx::query_as::<_, Item>(&format!("{SELECT_ITEM} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(mut item) = current else {
            tx.rollback().await?;
            return Ok(None);
        };

        patch.apply_to(&mut item);
        let updated = sqlx::query(
            r#"
            UPDATE item
               SET item_type = ?, category = ?, color = ?, price = ?, condition = ?,
                   name = ?, description = ?, image_url = ?, custom = ?
             WHERE id = ?
            "#,
        )
        .bind(&item.item_type)
        .bind(&item.category)
        .bind(&item.color)
        .bind(item.price)
        .bind(&item.condition)
        .bind(&item.name)
        .bind(&item.description)
        .bind(&item.image_url)
        .bind(item.custom)
        .bind(id)
        .execute(&mut *tx)
        .await;

        if let Err(e) = updated {
            tx.rollback().await?;
            return Err(classify(e));
        }
        tx.commit().await?;
        info!(item_id = id, "listing updated");
        Ok(Some(item))
    }

    /// Returns whether a row was removed. Authorization is the caller's job.
    pub async fn delete(db: &SqlitePool, id: i64) -> sqlx::Result<bool> {
        let res = sqlx::query("DELETE FROM item WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;
        let removed = res.rows_affected() > 0;
        if removed {
            info!(item_id = id, "listing deleted");
        }
        Ok(removed)
    }
}
