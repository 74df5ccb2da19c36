//! # Stock Repository
//!
//! Database operations for the stock catalog.
//!
//! ## Quantity Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                Conditional Decrement (inside bill tx)                   │
//! │                                                                         │
//! │  UPDATE stock_items                                                    │
//! │     SET available_quantity = available_quantity - n                    │
//! │   WHERE id = ? AND available_quantity >= n                             │
//! │       │                                                                 │
//! │       ├── 1 row  → ok                                                  │
//! │       └── 0 rows → InsufficientStockForItem, caller's tx rolls back    │
//! │                                                                         │
//! │  Two requests composed against the same snapshot: the second one to   │
//! │  reach the UPDATE loses instead of driving stock negative.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::sqlite::SqliteConnection;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use billbook_core::ledger::StockDelta;
use billbook_core::validation::{validate_available_quantity, validate_new_stock_item};
use billbook_core::{CoreError, NewStockItem, StockItem};

use crate::error::{DbError, DbResult};

const STOCK_COLUMNS: &str = "id, account_id, name, hsn_code, unit_price_cents, \
                             available_quantity, created_at, updated_at";

/// Counts from a bulk upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
}

/// Repository for stock catalog operations.
///
/// ## Usage
/// ```rust,ignore
/// let stock = db.stock();
/// let catalog = stock.list().await?;
/// stock.set_quantity(3, 12).await?;
/// ```
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
    account_id: String,
}

impl StockRepository {
    /// Creates a repository scoped to `account_id`.
    pub fn new(pool: SqlitePool, account_id: String) -> Self {
        StockRepository { pool, account_id }
    }

    /// Returns the whole catalog in insertion order.
    pub async fn list(&self) -> DbResult<Vec<StockItem>> {
        let items = sqlx::query_as::<_, StockItem>(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock_items WHERE account_id = ?1 ORDER BY id"
        ))
        .bind(&self.account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Counts catalog entries.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stock_items WHERE account_id = ?1")
                .bind(&self.account_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Gets an entry by id.
    pub async fn get(&self, id: i64) -> DbResult<Option<StockItem>> {
        let item = sqlx::query_as::<_, StockItem>(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock_items WHERE id = ?1 AND account_id = ?2"
        ))
        .bind(id)
        .bind(&self.account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Inserts a new entry.
    ///
    /// ## Errors
    /// - `DbError::Core(Validation)` for a bad name, price or quantity
    /// - `DbError::UniqueViolation` if the name is taken
    pub async fn insert(&self, draft: &NewStockItem) -> DbResult<StockItem> {
        validate_new_stock_item(draft)?;
        let name = draft.name.trim();
        let now = Utc::now();

        debug!(name = %name, price = draft.unit_price_cents, "Inserting stock item");

        let result = sqlx::query(
            r#"
            INSERT INTO stock_items (
                account_id, name, hsn_code, unit_price_cents,
                available_quantity, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
        )
        .bind(&self.account_id)
        .bind(name)
        .bind(draft.hsn_code.as_deref())
        .bind(draft.unit_price_cents)
        .bind(draft.available_quantity)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("name", name),
            other => other,
        })?;

        let id = result.last_insert_rowid();
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("StockItem", id.to_string()))
    }

    /// Inserts new names and overwrites price and quantity of existing ones,
    /// all in one transaction.
    ///
    /// An existing HSN code is kept when the draft has none.
    pub async fn upsert_many(&self, drafts: &[NewStockItem]) -> DbResult<UpsertSummary> {
        let mut summary = UpsertSummary::default();
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        for draft in drafts {
            validate_new_stock_item(draft)?;
            let name = draft.name.trim();

            let existing: Option<i64> = sqlx::query_scalar(
                "SELECT id FROM stock_items WHERE account_id = ?1 AND name = ?2",
            )
            .bind(&self.account_id)
            .bind(name)
            .fetch_optional(&mut *tx)
            .await?;

            match existing {
                Some(id) => {
                    sqlx::query(
                        r#"
                        UPDATE stock_items SET
                            unit_price_cents = ?1,
                            available_quantity = ?2,
                            hsn_code = COALESCE(?3, hsn_code),
                            updated_at = ?4
                        WHERE id = ?5
                        "#,
                    )
                    .bind(draft.unit_price_cents)
                    .bind(draft.available_quantity)
                    .bind(draft.hsn_code.as_deref())
                    .bind(now)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                    summary.updated += 1;
                }
                None => {
                    sqlx::query(
                        r#"
                        INSERT INTO stock_items (
                            account_id, name, hsn_code, unit_price_cents,
                            available_quantity, created_at, updated_at
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                        "#,
                    )
                    .bind(&self.account_id)
                    .bind(name)
                    .bind(draft.hsn_code.as_deref())
                    .bind(draft.unit_price_cents)
                    .bind(draft.available_quantity)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;
                    summary.inserted += 1;
                }
            }
        }

        tx.commit().await.map_err(DbError::commit_failed)?;

        info!(
            inserted = summary.inserted,
            updated = summary.updated,
            "Stock catalog upserted"
        );
        Ok(summary)
    }

    /// Overwrites an entry's on-hand quantity.
    pub async fn set_quantity(&self, id: i64, quantity: i64) -> DbResult<StockItem> {
        validate_available_quantity(quantity)?;

        let result = sqlx::query(
            "UPDATE stock_items SET available_quantity = ?1, updated_at = ?2 \
             WHERE id = ?3 AND account_id = ?4",
        )
        .bind(quantity)
        .bind(Utc::now())
        .bind(id)
        .bind(&self.account_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::StockItemNotFound(id).into());
        }

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("StockItem", id.to_string()))
    }

    /// Deletes an entry. Issued bills keep their line snapshots.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM stock_items WHERE id = ?1 AND account_id = ?2")
            .bind(id)
            .bind(&self.account_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::StockItemNotFound(id).into());
        }
        Ok(())
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Takes `-delta.delta` units out of stock, failing instead of going negative.
pub(crate) async fn take_stock(
    conn: &mut SqliteConnection,
    account_id: &str,
    delta: &StockDelta,
) -> DbResult<()> {
    let requested = -delta.delta;

    let result = sqlx::query(
        r#"
        UPDATE stock_items SET
            available_quantity = available_quantity - ?1,
            updated_at = ?2
        WHERE id = ?3 AND account_id = ?4 AND available_quantity >= ?1
        "#,
    )
    .bind(requested)
    .bind(Utc::now())
    .bind(delta.stock_id)
    .bind(account_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    let available: Option<i64> = sqlx::query_scalar(
        "SELECT available_quantity FROM stock_items WHERE id = ?1 AND account_id = ?2",
    )
    .bind(delta.stock_id)
    .bind(account_id)
    .fetch_optional(&mut *conn)
    .await?;

    let err = match available {
        Some(available) => CoreError::InsufficientStockForItem {
            name: delta.name.clone(),
            available,
            requested,
        },
        None => CoreError::StockItemNotFound(delta.stock_id),
    };
    Err(err.into())
}

/// Puts `delta.delta` units back. Returns false if the entry no longer exists.
pub(crate) async fn return_stock(
    conn: &mut SqliteConnection,
    account_id: &str,
    delta: &StockDelta,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE stock_items SET
            available_quantity = available_quantity + ?1,
            updated_at = ?2
        WHERE id = ?3 AND account_id = ?4
        "#,
    )
    .bind(delta.delta)
    .bind(Utc::now())
    .bind(delta.stock_id)
    .bind(account_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        warn!(stock_id = delta.stock_id, name = %delta.name, "Stock entry gone, nothing restored");
        return Ok(false);
    }
    Ok(true)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};
    use billbook_core::{CoreError, NewStockItem};

    fn draft(name: &str, price: i64, qty: i64) -> NewStockItem {
        NewStockItem {
            name: name.to_string(),
            hsn_code: None,
            unit_price_cents: price,
            available_quantity: qty,
        }
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let stock = db.stock();

        let rice = stock.insert(&draft("Rice", 8000, 10)).await.unwrap();
        stock.insert(&draft("Oil", 12000, 5)).await.unwrap();

        let catalog = stock.list().await.unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].id, rice.id);
        assert_eq!(catalog[0].account_id, "default");
        assert_eq!(stock.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let stock = db.stock();

        stock.insert(&draft("Rice", 8000, 10)).await.unwrap();
        let err = stock.insert(&draft("Rice", 9000, 1)).await.unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { ref value, .. } if value == "Rice"));
    }

    #[tokio::test]
    async fn test_invalid_draft_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let err = db.stock().insert(&draft("", 100, 1)).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_upsert_updates_existing_names() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let stock = db.stock();
        stock
            .insert(&NewStockItem {
                hsn_code: Some("1006".to_string()),
                ..draft("Rice", 8000, 10)
            })
            .await
            .unwrap();

        let summary = stock
            .upsert_many(&[draft("Rice", 8500, 3), draft("Sugar", 6000, 7)])
            .await
            .unwrap();

        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.updated, 1);

        let catalog = stock.list().await.unwrap();
        let rice = catalog.iter().find(|i| i.name == "Rice").unwrap();
        assert_eq!(rice.unit_price_cents, 8500);
        assert_eq!(rice.available_quantity, 3);
        assert_eq!(rice.hsn_code.as_deref(), Some("1006"));
    }

    #[tokio::test]
    async fn test_set_quantity_and_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let stock = db.stock();
        let rice = stock.insert(&draft("Rice", 8000, 10)).await.unwrap();

        let updated = stock.set_quantity(rice.id, 0).await.unwrap();
        assert_eq!(updated.available_quantity, 0);
        assert!(!updated.is_sellable());

        stock.delete(rice.id).await.unwrap();
        assert!(stock.get(rice.id).await.unwrap().is_none());
        assert!(matches!(
            stock.delete(rice.id).await.unwrap_err(),
            DbError::Core(CoreError::StockItemNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_accounts_are_isolated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.stock().insert(&draft("Rice", 8000, 10)).await.unwrap();

        let other = crate::StockRepository::new(db.pool().clone(), "shop-2".to_string());
        assert!(other.list().await.unwrap().is_empty());
        other.insert(&draft("Rice", 7000, 1)).await.unwrap();
    }
}
