//! PostgreSQL persistence for `user_logins`
//!
//! One pool is created per run and shared by the schema fixup, the inserts and
//! the final dump. Each insert runs as its own implicit transaction, so rows
//! written before a failure stay committed.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::{LoginRow, StoredLogin};

pub const TABLE_NAME: &str = "user_logins";

const WIDEN_APP_VERSION_SQL: &str =
    "ALTER TABLE user_logins ALTER COLUMN app_version TYPE varchar";

const INSERT_LOGIN_SQL: &str = "INSERT INTO user_logins \
     (user_id, device_type, masked_ip, masked_device_id, locale, app_version, create_date) \
     VALUES ($1, $2, $3, $4, $5, $6, $7)";

const SELECT_ALL_SQL: &str = "SELECT \
     user_id::text AS user_id, \
     device_type::text AS device_type, \
     masked_ip::text AS masked_ip, \
     masked_device_id::text AS masked_device_id, \
     locale::text AS locale, \
     app_version::text AS app_version, \
     create_date::text AS create_date \
     FROM user_logins";

/// Destination for rows produced by the pipeline
#[async_trait]
pub trait LoginSink: Send + Sync {
    async fn insert_login(&self, row: &LoginRow) -> Result<()>;
}

/// Outcome of the startup column fixup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaFixup {
    Altered,
    /// The ALTER failed and was rolled back; the run continues
    Skipped(String),
}

#[derive(Clone)]
pub struct LoginStore {
    pool: PgPool,
}

impl LoginStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Widen `app_version` to varchar so versions like "9.3.1" fit.
    ///
    /// Failure of the ALTER itself is logged and reported as `Skipped`;
    /// failure to open the transaction is a connectivity error and propagates.
    pub async fn widen_app_version_column(&self) -> Result<SchemaFixup> {
        let mut tx = self.pool.begin().await?;

        match sqlx::query(WIDEN_APP_VERSION_SQL).execute(&mut *tx).await {
            Ok(_) => {
                tx.commit().await?;
                info!(table = TABLE_NAME, "Altered the data type of app_version to varchar");
                Ok(SchemaFixup::Altered)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback after failed ALTER also failed");
                }
                warn!(table = TABLE_NAME, error = %e, "Schema fixup failed, continuing");
                Ok(SchemaFixup::Skipped(e.to_string()))
            }
        }
    }

    /// Read every row in storage order, each column rendered as text
    pub async fn fetch_all(&self) -> Result<Vec<StoredLogin>> {
        let rows = sqlx::query_as::<_, StoredLogin>(SELECT_ALL_SQL)
            .fetch_all(&self.pool)
            .await?;
        debug!(rows = rows.len(), table = TABLE_NAME, "Fetched all rows");
        Ok(rows)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl LoginSink for LoginStore {
    async fn insert_login(&self, row: &LoginRow) -> Result<()> {
        sqlx::query(INSERT_LOGIN_SQL)
            .bind(&row.user_id)
            .bind(&row.device_type)
            .bind(&row.masked_ip)
            .bind(&row.masked_device_id)
            .bind(&row.locale)
            .bind(&row.app_version)
            .bind(row.create_date)
            .execute(&self.pool)
            .await?;

        debug!(user_id = %row.user_id, table = TABLE_NAME, "Inserted login row");
        Ok(())
    }
}
