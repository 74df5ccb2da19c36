//! # Bill Repository
//!
//! Persists issued bills and keeps stock in step with them.
//!
//! ## Bill Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Bill Lifecycle                                  │
//! │                                                                         │
//! │  1. CREATE (one SQLite transaction)                                    │
//! │     ├── mark source transaction billed (if any)                        │
//! │     ├── conditional stock decrement per line                           │
//! │     ├── next number from bill_counters → INV-000042                    │
//! │     └── insert bill + bill_items                                       │
//! │        any step fails → ROLLBACK, nothing persisted                    │
//! │                                                                         │
//! │  2. DELETE (one SQLite transaction)                                    │
//! │     ├── restore stock per line                                         │
//! │     ├── un-mark source transaction                                     │
//! │     └── delete bill (items cascade)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Bill numbers are never reused: deleting `INV-000042` leaves a gap.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteConnection;
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use billbook_core::billing::format_bill_number;
use billbook_core::ledger::{plan_stock_restore, requested_decrements};
use billbook_core::validation::validate_customer_name;
use billbook_core::{
    lines_total, Bill, BillLineItem, CoreError, DateRange, NewBill, ValidationError,
};

use crate::error::{DbError, DbResult};
use crate::repository::stock::{return_stock, take_stock};

const BILL_COLUMNS: &str = "id, account_id, bill_number, customer_name, transaction_id, \
                            bill_date, total_cents, created_at";

#[derive(Debug, FromRow)]
struct BillRow {
    id: String,
    account_id: String,
    bill_number: String,
    customer_name: Option<String>,
    transaction_id: Option<String>,
    bill_date: NaiveDate,
    total_cents: i64,
    created_at: DateTime<Utc>,
}

impl BillRow {
    fn into_bill(self, items: Vec<BillLineItem>) -> Bill {
        Bill {
            id: self.id,
            account_id: self.account_id,
            bill_number: self.bill_number,
            customer_name: self.customer_name,
            transaction_id: self.transaction_id,
            bill_date: self.bill_date,
            items,
            total_cents: self.total_cents,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct BillItemRow {
    bill_id: String,
    stock_id: i64,
    name_snapshot: String,
    hsn_code: Option<String>,
    unit_price_cents: i64,
    quantity: i64,
}

impl From<BillItemRow> for BillLineItem {
    fn from(row: BillItemRow) -> Self {
        BillLineItem {
            stock_id: row.stock_id,
            name: row.name_snapshot,
            hsn_code: row.hsn_code,
            unit_price_cents: row.unit_price_cents,
            quantity: row.quantity,
        }
    }
}

/// Repository for bills.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
    account_id: String,
}

impl BillRepository {
    /// Creates a repository scoped to `account_id`.
    pub fn new(pool: SqlitePool, account_id: String) -> Self {
        BillRepository { pool, account_id }
    }

    /// Stores a bill and takes its lines out of stock atomically.
    ///
    /// ## Errors
    /// - `DbError::Core(InsufficientStockForItem)` when stock ran out since
    ///   the bill was composed; nothing is written
    /// - `DbError::NotFound` for an unknown transaction id
    pub async fn create(&self, draft: &NewBill) -> DbResult<Bill> {
        let mut tx = self.pool.begin().await?;
        let bill = insert_bill(&mut tx, &self.account_id, draft).await?;
        tx.commit().await.map_err(DbError::commit_failed)?;

        info!(
            id = %bill.id,
            bill_number = %bill.bill_number,
            total = %bill.total(),
            "Bill created"
        );
        Ok(bill)
    }

    /// Stores several bills in one transaction: all or none.
    pub async fn create_many(&self, drafts: &[NewBill]) -> DbResult<Vec<Bill>> {
        let mut tx = self.pool.begin().await?;
        let mut bills = Vec::with_capacity(drafts.len());

        for draft in drafts {
            bills.push(insert_bill(&mut tx, &self.account_id, draft).await?);
        }

        tx.commit().await.map_err(DbError::commit_failed)?;
        info!(count = bills.len(), "Bills created");
        Ok(bills)
    }

    /// Gets a bill with its lines.
    pub async fn get(&self, id: &str) -> DbResult<Option<Bill>> {
        let mut conn = self.pool.acquire().await?;
        fetch_bill(&mut conn, &self.account_id, id).await
    }

    /// The most recently created bill, used for the one-bill lookback.
    pub async fn latest(&self) -> DbResult<Option<Bill>> {
        let mut conn = self.pool.acquire().await?;

        let id: Option<String> = sqlx::query_scalar(
            "SELECT id FROM bills WHERE account_id = ?1 \
             ORDER BY created_at DESC, rowid DESC LIMIT 1",
        )
        .bind(&self.account_id)
        .fetch_optional(&mut *conn)
        .await?;

        match id {
            Some(id) => fetch_bill(&mut conn, &self.account_id, &id).await,
            None => Ok(None),
        }
    }

    /// Bills dated inside `range`, oldest first.
    pub async fn list(&self, range: DateRange) -> DbResult<Vec<Bill>> {
        let rows = sqlx::query_as::<_, BillRow>(&format!(
            r#"
            SELECT {BILL_COLUMNS} FROM bills
            WHERE account_id = ?1
              AND (?2 IS NULL OR bill_date >= ?2)
              AND (?3 IS NULL OR bill_date <= ?3)
            ORDER BY bill_date, rowid
            "#
        ))
        .bind(&self.account_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.pool)
        .await?;

        let item_rows = sqlx::query_as::<_, BillItemRow>(
            r#"
            SELECT bi.bill_id, bi.stock_id, bi.name_snapshot, bi.hsn_code,
                   bi.unit_price_cents, bi.quantity
            FROM bill_items bi
            JOIN bills b ON b.id = bi.bill_id
            WHERE b.account_id = ?1
              AND (?2 IS NULL OR b.bill_date >= ?2)
              AND (?3 IS NULL OR b.bill_date <= ?3)
            ORDER BY bi.bill_id, bi.line_no
            "#,
        )
        .bind(&self.account_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.pool)
        .await?;

        let mut items: HashMap<String, Vec<BillLineItem>> = HashMap::new();
        for row in item_rows {
            items.entry(row.bill_id.clone()).or_default().push(row.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let lines = items.remove(&row.id).unwrap_or_default();
                row.into_bill(lines)
            })
            .collect())
    }

    /// Counts bills for the account.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bills WHERE account_id = ?1")
            .bind(&self.account_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Deletes a bill, puts its stock back and frees its transaction.
    ///
    /// Lines whose catalog entry has since been deleted restore nothing.
    pub async fn delete(&self, id: &str) -> DbResult<Bill> {
        let mut tx = self.pool.begin().await?;

        let bill = fetch_bill(&mut tx, &self.account_id, id)
            .await?
            .ok_or_else(|| CoreError::BillNotFound(id.to_string()))?;

        for delta in plan_stock_restore(&bill.items)? {
            return_stock(&mut tx, &self.account_id, &delta).await?;
        }

        if let Some(txn_id) = &bill.transaction_id {
            sqlx::query("UPDATE transactions SET billed = 0 WHERE id = ?1 AND account_id = ?2")
                .bind(txn_id)
                .bind(&self.account_id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("DELETE FROM bills WHERE id = ?1 AND account_id = ?2")
            .bind(id)
            .bind(&self.account_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await.map_err(DbError::commit_failed)?;

        info!(id = %bill.id, bill_number = %bill.bill_number, "Bill deleted, stock restored");
        Ok(bill)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

async fn insert_bill(
    conn: &mut SqliteConnection,
    account_id: &str,
    draft: &NewBill,
) -> DbResult<Bill> {
    if draft.items.is_empty() {
        return Err(ValidationError::Required {
            field: "bill items".to_string(),
        }
        .into());
    }
    validate_customer_name(draft.customer_name.as_deref())?;

    let computed = lines_total(&draft.items);
    if computed.cents() != draft.total_cents {
        return Err(ValidationError::InvalidFormat {
            field: "total".to_string(),
            reason: format!("lines sum to {}, bill says {}", computed, draft.total_cents),
        }
        .into());
    }

    if let Some(txn_id) = &draft.transaction_id {
        claim_transaction(conn, account_id, txn_id).await?;
    }

    for delta in requested_decrements(&draft.items)? {
        take_stock(conn, account_id, &delta).await?;
    }

    let sequence: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO bill_counters (account_id, last_number) VALUES (?1, 1)
        ON CONFLICT (account_id) DO UPDATE SET last_number = last_number + 1
        RETURNING last_number
        "#,
    )
    .bind(account_id)
    .fetch_one(&mut *conn)
    .await?;

    let bill = Bill {
        id: Uuid::new_v4().to_string(),
        account_id: account_id.to_string(),
        bill_number: format_bill_number(sequence),
        customer_name: draft.customer_name.clone(),
        transaction_id: draft.transaction_id.clone(),
        bill_date: draft.bill_date,
        items: draft.items.clone(),
        total_cents: draft.total_cents,
        created_at: Utc::now(),
    };

    debug!(id = %bill.id, bill_number = %bill.bill_number, "Inserting bill");

    sqlx::query(
        r#"
        INSERT INTO bills (
            id, account_id, bill_number, customer_name, transaction_id,
            bill_date, total_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&bill.id)
    .bind(&bill.account_id)
    .bind(&bill.bill_number)
    .bind(bill.customer_name.as_deref())
    .bind(bill.transaction_id.as_deref())
    .bind(bill.bill_date)
    .bind(bill.total_cents)
    .bind(bill.created_at)
    .execute(&mut *conn)
    .await?;

    for (index, line) in bill.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO bill_items (
                bill_id, line_no, stock_id, name_snapshot, hsn_code,
                unit_price_cents, quantity
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&bill.id)
        .bind(index as i64 + 1)
        .bind(line.stock_id)
        .bind(&line.name)
        .bind(line.hsn_code.as_deref())
        .bind(line.unit_price_cents)
        .bind(line.quantity)
        .execute(&mut *conn)
        .await?;
    }

    Ok(bill)
}

/// Marks an unbilled transaction as billed.
async fn claim_transaction(
    conn: &mut SqliteConnection,
    account_id: &str,
    txn_id: &str,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE transactions SET billed = 1 WHERE id = ?1 AND account_id = ?2 AND billed = 0",
    )
    .bind(txn_id)
    .bind(account_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    let exists: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM transactions WHERE id = ?1 AND account_id = ?2")
            .bind(txn_id)
            .bind(account_id)
            .fetch_optional(&mut *conn)
            .await?;

    match exists {
        Some(_) => Err(ValidationError::Duplicate {
            field: "bill for transaction".to_string(),
            value: txn_id.to_string(),
        }
        .into()),
        None => Err(DbError::not_found("Transaction", txn_id)),
    }
}

async fn fetch_bill(
    conn: &mut SqliteConnection,
    account_id: &str,
    id: &str,
) -> DbResult<Option<Bill>> {
    let row = sqlx::query_as::<_, BillRow>(&format!(
        "SELECT {BILL_COLUMNS} FROM bills WHERE id = ?1 AND account_id = ?2"
    ))
    .bind(id)
    .bind(account_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let items = sqlx::query_as::<_, BillItemRow>(
        r#"
        SELECT bill_id, stock_id, name_snapshot, hsn_code, unit_price_cents, quantity
        FROM bill_items
        WHERE bill_id = ?1
        ORDER BY line_no
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(BillLineItem::from)
    .collect();

    Ok(Some(row.into_bill(items)))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use billbook_core::{NewStockItem, NewTransaction, StockItem};

    async fn seeded() -> (Database, Vec<StockItem>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for (name, price, qty) in [("Rice", 8000, 10), ("Oil", 12000, 2), ("Sugar", 6000, 10)] {
            db.stock()
                .insert(&NewStockItem {
                    name: name.to_string(),
                    hsn_code: None,
                    unit_price_cents: price,
                    available_quantity: qty,
                })
                .await
                .unwrap();
        }
        let catalog = db.stock().list().await.unwrap();
        (db, catalog)
    }

    fn line(item: &StockItem, qty: i64) -> BillLineItem {
        BillLineItem {
            stock_id: item.id,
            name: item.name.clone(),
            hsn_code: item.hsn_code.clone(),
            unit_price_cents: item.unit_price_cents,
            quantity: qty,
        }
    }

    fn draft(items: Vec<BillLineItem>) -> NewBill {
        NewBill {
            customer_name: Some("Asha".to_string()),
            transaction_id: None,
            bill_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            total_cents: lines_total(&items).cents(),
            items,
        }
    }

    fn quantity(catalog: &[StockItem], name: &str) -> i64 {
        catalog.iter().find(|i| i.name == name).unwrap().available_quantity
    }

    #[tokio::test]
    async fn test_create_decrements_and_delete_restores() {
        let (db, catalog) = seeded().await;
        let bills = db.bills();

        let bill = bills
            .create(&draft(vec![line(&catalog[0], 2), line(&catalog[1], 1)]))
            .await
            .unwrap();

        assert_eq!(bill.bill_number, "INV-000001");
        let after = db.stock().list().await.unwrap();
        assert_eq!(quantity(&after, "Rice"), 8);
        assert_eq!(quantity(&after, "Oil"), 1);

        let stored = bills.get(&bill.id).await.unwrap().unwrap();
        assert_eq!(stored.items, bill.items);
        assert_eq!(stored.total_cents, bill.total_cents);
        assert_eq!(stored.customer_name.as_deref(), Some("Asha"));

        bills.delete(&bill.id).await.unwrap();
        let restored = db.stock().list().await.unwrap();
        assert_eq!(quantity(&restored, "Rice"), 10);
        assert_eq!(quantity(&restored, "Oil"), 2);
        assert!(bills.get(&bill.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_losing_request_rolls_back() {
        let (db, catalog) = seeded().await;
        let bills = db.bills();

        // Both drafts were composed against the same snapshot (Oil: 2).
        let first = draft(vec![line(&catalog[1], 2), line(&catalog[0], 1)]);
        let second = draft(vec![line(&catalog[0], 1), line(&catalog[1], 1)]);

        bills.create(&first).await.unwrap();
        let err = bills.create(&second).await.unwrap_err();

        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientStockForItem {
                available: 0,
                requested: 1,
                ..
            })
        ));

        // Rice decrement from the losing bill was rolled back too.
        let after = db.stock().list().await.unwrap();
        assert_eq!(quantity(&after, "Rice"), 9);
        assert_eq!(quantity(&after, "Oil"), 0);
        assert_eq!(bills.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_numbers_are_sequential_and_latest_tracks_them() {
        let (db, catalog) = seeded().await;
        let bills = db.bills();

        assert!(bills.latest().await.unwrap().is_none());

        let a = bills.create(&draft(vec![line(&catalog[0], 1), line(&catalog[2], 1)])).await.unwrap();
        let b = bills.create(&draft(vec![line(&catalog[2], 1), line(&catalog[0], 1)])).await.unwrap();

        assert_eq!(a.bill_number, "INV-000001");
        assert_eq!(b.bill_number, "INV-000002");
        assert_eq!(bills.latest().await.unwrap().unwrap().id, b.id);

        // Deleting does not free the number.
        bills.delete(&b.id).await.unwrap();
        let c = bills.create(&draft(vec![line(&catalog[0], 1), line(&catalog[2], 1)])).await.unwrap();
        assert_eq!(c.bill_number, "INV-000003");
    }

    #[tokio::test]
    async fn test_transaction_is_claimed_once() {
        let (db, catalog) = seeded().await;
        let txns = db
            .transactions()
            .insert_many(&[NewTransaction {
                txn_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
                customer_name: None,
                amount_cents: 14000,
                reference: None,
            }])
            .await
            .unwrap();

        let mut with_txn = draft(vec![line(&catalog[0], 1), line(&catalog[2], 1)]);
        with_txn.transaction_id = Some(txns[0].id.clone());

        let bill = db.bills().create(&with_txn).await.unwrap();
        assert!(db.transactions().list_unbilled().await.unwrap().is_empty());

        let err = db.bills().create(&with_txn).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));

        db.bills().delete(&bill.id).await.unwrap();
        assert_eq!(db.transactions().list_unbilled().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_filters_by_date() {
        let (db, catalog) = seeded().await;
        let mut early = draft(vec![line(&catalog[0], 1), line(&catalog[2], 1)]);
        early.bill_date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let late = draft(vec![line(&catalog[2], 1), line(&catalog[0], 1)]);

        db.bills().create_many(&[early, late]).await.unwrap();

        let all = db.bills().list(DateRange::all()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].items.len(), 2);

        let april = db
            .bills()
            .list(DateRange {
                from: NaiveDate::from_ymd_opt(2024, 4, 1),
                to: None,
            })
            .await
            .unwrap();
        assert_eq!(april.len(), 1);
        assert_eq!(april[0].items[0].name, "Sugar");
    }

    #[tokio::test]
    async fn test_mismatched_total_rejected() {
        let (db, catalog) = seeded().await;
        let mut bad = draft(vec![line(&catalog[0], 1), line(&catalog[2], 1)]);
        bad.total_cents += 1;

        assert!(db.bills().create(&bad).await.is_err());
        assert_eq!(quantity(&db.stock().list().await.unwrap(), "Rice"), 10);
    }

    #[tokio::test]
    async fn test_delete_unknown_bill() {
        let (db, _) = seeded().await;
        let err = db.bills().delete("missing").await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::BillNotFound(_))));
    }
}
