//! # Transaction Repository
//!
//! Imported payment records that bills are generated against.
//!
//! A transaction is `billed` from the moment a bill referencing it is stored
//! until that bill is deleted; see [`super::bill`].

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use billbook_core::validation::validate_new_transaction;
use billbook_core::{DateRange, NewTransaction, Transaction};

use crate::error::{DbError, DbResult};

const TXN_COLUMNS: &str =
    "id, account_id, txn_date, customer_name, amount_cents, reference, billed, created_at";

/// Repository for imported transactions.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
    account_id: String,
}

impl TransactionRepository {
    /// Creates a repository scoped to `account_id`.
    pub fn new(pool: SqlitePool, account_id: String) -> Self {
        TransactionRepository { pool, account_id }
    }

    /// Validates and stores a batch in one transaction.
    ///
    /// Any invalid draft rejects the whole batch.
    pub async fn insert_many(&self, drafts: &[NewTransaction]) -> DbResult<Vec<Transaction>> {
        for draft in drafts {
            validate_new_transaction(draft)?;
        }

        let now = Utc::now();
        let mut stored = Vec::with_capacity(drafts.len());
        let mut tx = self.pool.begin().await?;

        for draft in drafts {
            let txn = Transaction {
                id: Uuid::new_v4().to_string(),
                account_id: self.account_id.clone(),
                txn_date: draft.txn_date,
                customer_name: draft
                    .customer_name
                    .as_ref()
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty()),
                amount_cents: draft.amount_cents,
                reference: draft.reference.clone(),
                billed: false,
                created_at: now,
            };

            sqlx::query(
                r#"
                INSERT INTO transactions (
                    id, account_id, txn_date, customer_name,
                    amount_cents, reference, billed, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)
                "#,
            )
            .bind(&txn.id)
            .bind(&txn.account_id)
            .bind(txn.txn_date)
            .bind(txn.customer_name.as_deref())
            .bind(txn.amount_cents)
            .bind(txn.reference.as_deref())
            .bind(txn.created_at)
            .execute(&mut *tx)
            .await?;

            stored.push(txn);
        }

        tx.commit().await.map_err(DbError::commit_failed)?;
        info!(count = stored.len(), "Transactions imported");
        Ok(stored)
    }

    /// Gets a transaction by id.
    pub async fn get(&self, id: &str) -> DbResult<Option<Transaction>> {
        let txn = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TXN_COLUMNS} FROM transactions WHERE id = ?1 AND account_id = ?2"
        ))
        .bind(id)
        .bind(&self.account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(txn)
    }

    /// Transactions dated inside `range`, in date then import order.
    pub async fn list(&self, range: DateRange) -> DbResult<Vec<Transaction>> {
        let txns = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            SELECT {TXN_COLUMNS} FROM transactions
            WHERE account_id = ?1
              AND (?2 IS NULL OR txn_date >= ?2)
              AND (?3 IS NULL OR txn_date <= ?3)
            ORDER BY txn_date, rowid
            "#
        ))
        .bind(&self.account_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.pool)
        .await?;

        Ok(txns)
    }

    /// Transactions still waiting for a bill, in date then import order.
    pub async fn list_unbilled(&self) -> DbResult<Vec<Transaction>> {
        let txns = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TXN_COLUMNS} FROM transactions \
             WHERE account_id = ?1 AND billed = 0 ORDER BY txn_date, rowid"
        ))
        .bind(&self.account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(txns)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};
    use billbook_core::{CoreError, DateRange, NewTransaction};
    use chrono::NaiveDate;

    fn draft(day: u32, amount: i64) -> NewTransaction {
        NewTransaction {
            txn_date: NaiveDate::from_ymd_opt(2024, 4, day).unwrap(),
            customer_name: Some(" Ravi ".to_string()),
            amount_cents: amount,
            reference: Some(format!("UTR{day}")),
        }
    }

    #[tokio::test]
    async fn test_insert_and_list_in_date_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.transactions();

        let stored = repo
            .insert_many(&[draft(5, 30000), draft(2, 12000)])
            .await
            .unwrap();
        assert_eq!(stored[0].customer_name.as_deref(), Some("Ravi"));

        let listed = repo.list(DateRange::all()).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].amount_cents, 12000);
        assert!(!listed[0].billed);

        let fetched = repo.get(&stored[0].id).await.unwrap().unwrap();
        assert_eq!(fetched.reference.as_deref(), Some("UTR5"));
        assert_eq!(repo.list_unbilled().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_amount_rejects_batch() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.transactions();

        let err = repo
            .insert_many(&[draft(1, 500), draft(2, 0)])
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
        assert!(repo.list(DateRange::all()).await.unwrap().is_empty());
    }
}
