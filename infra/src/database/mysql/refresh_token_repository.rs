//! MySQL implementation of the RefreshTokenRepository trait.
//!
//! Rotation state lives in the `refresh_tokens` table so that every server
//! instance behind the load balancer agrees on which tokens were consumed.
//! Identifiers are stored as hyphenated `CHAR(36)` strings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySql, MySqlPool, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use bc_core::domain::{RefreshTokenRecord, SubjectType};
use bc_core::errors::DomainError;
use bc_core::repositories::RefreshTokenRepository;

const SELECT_COLUMNS: &str = r#"
    SELECT token_id, family_id, subject_id, subject_type, is_revoked,
           issued_at, expires_at, last_used_at
    FROM refresh_tokens
"#;

/// MySQL implementation of RefreshTokenRepository
///
/// `exchange` runs the conditional `UPDATE ... WHERE is_revoked = FALSE` and
/// the successor insert in one transaction. InnoDB serialises concurrent
/// updates of the same row, so only one caller sees an affected row.
/// Revoked families are recorded in `revoked_token_families`; every insert is
/// conditional on the family being absent from it.
#[derive(Clone)]
pub struct MySqlRefreshTokenRepository {
    /// Database connection pool
    pool: MySqlPool,
}

impl MySqlRefreshTokenRepository {
    /// Create a new MySQL refresh token repository
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Convert database row to RefreshTokenRecord
    fn row_to_record(row: &sqlx::mysql::MySqlRow) -> Result<RefreshTokenRecord, DomainError> {
        let token_id: String = row.try_get("token_id").map_err(column_error("token_id"))?;
        let family_id: String = row.try_get("family_id").map_err(column_error("family_id"))?;
        let subject_type: String = row.try_get("subject_type").map_err(column_error("subject_type"))?;

        Ok(RefreshTokenRecord {
            token_id: parse_uuid(&token_id, "token_id")?,
            family_id: parse_uuid(&family_id, "family_id")?,
            subject_id: row.try_get("subject_id").map_err(column_error("subject_id"))?,
            subject_type: subject_type
                .parse::<SubjectType>()
                .map_err(|message| DomainError::Internal { message })?,
            is_revoked: row.try_get("is_revoked").map_err(column_error("is_revoked"))?,
            issued_at: row
                .try_get::<DateTime<Utc>, _>("issued_at")
                .map_err(column_error("issued_at"))?,
            expires_at: row
                .try_get::<DateTime<Utc>, _>("expires_at")
                .map_err(column_error("expires_at"))?,
            last_used_at: row
                .try_get::<Option<DateTime<Utc>>, _>("last_used_at")
                .map_err(column_error("last_used_at"))?,
        })
    }
}

/// Insert `record` unless its family carries a revocation marker
///
/// Returns the number of inserted rows, 0 when the family is revoked.
async fn insert_unless_family_revoked<'c, E>(
    executor: E,
    record: &RefreshTokenRecord,
) -> Result<u64, sqlx::Error>
where
    E: sqlx::Executor<'c, Database = MySql>,
{
    let query = r#"
        INSERT INTO refresh_tokens (
            token_id, family_id, subject_id, subject_type, is_revoked,
            issued_at, expires_at, last_used_at
        )
        SELECT ?, ?, ?, ?, ?, ?, ?, ?
        FROM DUAL
        WHERE NOT EXISTS (
            SELECT 1 FROM revoked_token_families WHERE family_id = ?
        )
    "#;

    let result = sqlx::query(query)
        .bind(record.token_id.to_string())
        .bind(record.family_id.to_string())
        .bind(&record.subject_id)
        .bind(record.subject_type.as_str())
        .bind(record.is_revoked)
        .bind(record.issued_at)
        .bind(record.expires_at)
        .bind(record.last_used_at)
        .bind(record.family_id.to_string())
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

fn insert_error(record: &RefreshTokenRecord, e: sqlx::Error) -> DomainError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => DomainError::Validation {
            message: format!("Refresh token {} already exists", record.token_id),
        },
        other => query_error("save refresh token", other),
    }
}

fn column_error(column: &'static str) -> impl Fn(sqlx::Error) -> DomainError {
    move |e| DomainError::Internal {
        message: format!("Failed to get {}: {}", column, e),
    }
}

fn parse_uuid(value: &str, column: &str) -> Result<Uuid, DomainError> {
    Uuid::parse_str(value).map_err(|e| DomainError::Internal {
        message: format!("Invalid {} UUID: {}", column, e),
    })
}

fn query_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::storage(format!("Failed to {}: {}", action, e))
}

#[async_trait]
impl RefreshTokenRepository for MySqlRefreshTokenRepository {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), DomainError> {
        let inserted = insert_unless_family_revoked(&self.pool, &record)
            .await
            .map_err(|e| insert_error(&record, e))?;

        if inserted == 0 {
            return Err(DomainError::Validation {
                message: format!("Refresh token family {} is revoked", record.family_id),
            });
        }

        debug!(token_id = %record.token_id, family_id = %record.family_id, "Refresh token stored");
        Ok(())
    }

    async fn find_by_token_id(&self, token_id: Uuid) -> Result<Option<RefreshTokenRecord>, DomainError> {
        let query = format!("{} WHERE token_id = ? LIMIT 1", SELECT_COLUMNS);

        let row = sqlx::query(&query)
            .bind(token_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| query_error("find refresh token", e))?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn exchange(
        &self,
        token_id: Uuid,
        successor: RefreshTokenRecord,
        used_at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| query_error("begin refresh token exchange", e))?;

        let consumed = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET is_revoked = TRUE, last_used_at = ?
            WHERE token_id = ? AND is_revoked = FALSE
            "#,
        )
        .bind(used_at)
        .bind(token_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| query_error("consume refresh token", e))?;

        if consumed.rows_affected() != 1 {
            tx.rollback()
                .await
                .map_err(|e| query_error("roll back refresh token exchange", e))?;
            return Ok(false);
        }

        let inserted = insert_unless_family_revoked(&mut *tx, &successor)
            .await
            .map_err(|e| insert_error(&successor, e))?;

        if inserted == 0 {
            tx.rollback()
                .await
                .map_err(|e| query_error("roll back refresh token exchange", e))?;
            return Ok(false);
        }

        tx.commit()
            .await
            .map_err(|e| query_error("commit refresh token exchange", e))?;

        debug!(
            token_id = %token_id,
            successor_id = %successor.token_id,
            family_id = %successor.family_id,
            "Refresh token exchanged"
        );
        Ok(true)
    }

    async fn is_family_revoked(&self, family_id: Uuid) -> Result<bool, DomainError> {
        let revoked: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM revoked_token_families WHERE family_id = ?)",
        )
        .bind(family_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| query_error("check token family", e))?;

        Ok(revoked == 1)
    }

    async fn revoke(&self, token_id: Uuid) -> Result<bool, DomainError> {
        let query = r#"
            UPDATE refresh_tokens
            SET is_revoked = TRUE
            WHERE token_id = ? AND is_revoked = FALSE
        "#;

        let result = sqlx::query(query)
            .bind(token_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| query_error("revoke refresh token", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke_family(&self, family_id: Uuid) -> Result<usize, DomainError> {
        // Marker first so a pending exchange cannot insert into the family
        sqlx::query(
            "INSERT IGNORE INTO revoked_token_families (family_id, revoked_at) VALUES (?, UTC_TIMESTAMP(6))",
        )
        .bind(family_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| query_error("mark token family revoked", e))?;

        let query = r#"
            UPDATE refresh_tokens
            SET is_revoked = TRUE
            WHERE family_id = ? AND is_revoked = FALSE
        "#;

        let result = sqlx::query(query)
            .bind(family_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| query_error("revoke token family", e))?;

        let revoked = result.rows_affected() as usize;
        if revoked > 0 {
            warn!(family_id = %family_id, revoked, "Refresh token family revoked");
        }
        Ok(revoked)
    }

    async fn revoke_all_for_subject(&self, subject_id: &str) -> Result<usize, DomainError> {
        sqlx::query(
            r#"
            INSERT IGNORE INTO revoked_token_families (family_id, revoked_at)
            SELECT DISTINCT family_id, UTC_TIMESTAMP(6)
            FROM refresh_tokens
            WHERE subject_id = ?
            "#,
        )
        .bind(subject_id)
        .execute(&self.pool)
        .await
        .map_err(|e| query_error("mark subject families revoked", e))?;

        let query = r#"
            UPDATE refresh_tokens
            SET is_revoked = TRUE
            WHERE subject_id = ? AND is_revoked = FALSE
        "#;

        let result = sqlx::query(query)
            .bind(subject_id)
            .execute(&self.pool)
            .await
            .map_err(|e| query_error("revoke subject tokens", e))?;

        Ok(result.rows_affected() as usize)
    }

    async fn find_by_family(&self, family_id: Uuid) -> Result<Vec<RefreshTokenRecord>, DomainError> {
        let query = format!("{} WHERE family_id = ? ORDER BY issued_at ASC", SELECT_COLUMNS);

        let rows = sqlx::query(&query)
            .bind(family_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| query_error("find token family", e))?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn delete(&self, token_id: Uuid) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token_id = ?")
            .bind(token_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| query_error("delete refresh token", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| query_error("delete expired refresh tokens", e))?;

        let deleted = result.rows_affected() as usize;

        // Markers are only needed while a record of the family remains
        let markers = sqlx::query(
            r#"
            DELETE f FROM revoked_token_families AS f
            WHERE NOT EXISTS (
                SELECT 1 FROM refresh_tokens AS t WHERE t.family_id = f.family_id
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| query_error("delete stale family markers", e))?;

        info!(
            deleted,
            markers_deleted = markers.rows_affected(),
            "Expired refresh tokens deleted"
        );
        Ok(deleted)
    }
}
