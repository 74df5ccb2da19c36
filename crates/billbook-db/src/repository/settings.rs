//! # Settings Repository
//!
//! Per-account key/value store. Values are JSON documents, so any serde type
//! can be kept here without a schema change.
//!
//! ```text
//! settings
//! ┌────────────┬──────────────────┬──────────────────────────────┐
//! │ account_id │ key              │ value                        │
//! ├────────────┼──────────────────┼──────────────────────────────┤
//! │ shop-1     │ export_options   │ {"hideCustomerNames":true…}  │
//! │ shop-1     │ compose_options  │ {"tolerance":3000,…}         │
//! └────────────┴──────────────────┴──────────────────────────────┘
//! ```

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Repository for JSON settings.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
    account_id: String,
}

impl SettingsRepository {
    /// Creates a repository scoped to `account_id`.
    pub fn new(pool: SqlitePool, account_id: String) -> Self {
        SettingsRepository { pool, account_id }
    }

    /// Loads the raw JSON stored under `key`.
    pub async fn load_json(&self, key: &str) -> DbResult<Option<serde_json::Value>> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT value FROM settings WHERE account_id = ?1 AND key = ?2")
                .bind(&self.account_id)
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        raw.map(|text| serde_json::from_str(&text))
            .transpose()
            .map_err(Into::into)
    }

    /// Stores raw JSON under `key`, replacing any previous value.
    pub async fn save_json(&self, key: &str, value: &serde_json::Value) -> DbResult<()> {
        debug!(key, "Saving setting");

        sqlx::query(
            r#"
            INSERT INTO settings (account_id, key, value, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (account_id, key)
            DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(&self.account_id)
        .bind(key)
        .bind(value.to_string())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Loads and deserializes the value under `key`.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> DbResult<Option<T>> {
        match self.load_json(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Serializes and stores `value` under `key`.
    pub async fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> DbResult<()> {
        let json = serde_json::to_value(value)?;
        self.save_json(key, &json).await
    }

    /// Removes `key`. Returns whether anything was stored.
    pub async fn delete(&self, key: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM settings WHERE account_id = ?1 AND key = ?2")
            .bind(&self.account_id)
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Prefs {
        bills_per_page: u32,
        hide_customer_names: bool,
    }

    #[tokio::test]
    async fn test_save_load_overwrite_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let settings = db.settings();

        assert_eq!(settings.load::<Prefs>("prefs").await.unwrap(), None);

        let prefs = Prefs {
            bills_per_page: 2,
            hide_customer_names: false,
        };
        settings.save("prefs", &prefs).await.unwrap();
        assert_eq!(settings.load::<Prefs>("prefs").await.unwrap(), Some(prefs));

        settings
            .save_json("prefs", &serde_json::json!({"bills_per_page": 4, "hide_customer_names": true}))
            .await
            .unwrap();
        let loaded: Prefs = settings.load("prefs").await.unwrap().unwrap();
        assert_eq!(loaded.bills_per_page, 4);

        assert!(settings.delete("prefs").await.unwrap());
        assert!(!settings.delete("prefs").await.unwrap());
    }

    #[tokio::test]
    async fn test_wrong_shape_is_serialization_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let settings = db.settings();
        settings.save("prefs", "not an object").await.unwrap();

        let err = settings.load::<Prefs>("prefs").await.unwrap_err();
        assert!(matches!(err, crate::DbError::Serialization(_)));
    }
}
