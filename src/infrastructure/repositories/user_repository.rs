use sqlx::{Connection, PgConnection};

use crate::infrastructure::db::{DbSession, SchemaAdapter};
use crate::{domain::user::UserRecord, error::HarnessResult};

/// Schema-tolerant access to MiniTwit's user rows.
///
/// Query failures are logged and reported as "not found" / "not deleted";
/// only the connection itself is allowed to fail loudly.
pub struct UserRepository<'a> {
    db: &'a mut DbSession,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a mut DbSession) -> Self {
        Self { db }
    }

    /// Find user by username
    pub async fn find_by_username(&mut self, username: &str) -> Option<UserRecord> {
        match self.try_find_by_username(username).await {
            Ok(user) => user,
            Err(e) => {
                tracing::error!(username, error = %e, "Error querying user");
                None
            }
        }
    }

    pub async fn exists(&mut self, username: &str) -> bool {
        self.find_by_username(username).await.is_some()
    }

    /// Delete a user with their follow edges and messages, in one transaction.
    ///
    /// Returns `true` when a user row was removed.
    pub async fn delete_by_username(&mut self, username: &str) -> bool {
        match self.try_delete_by_username(username).await {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::error!(username, error = %e, "Error deleting user");
                false
            }
        }
    }

    async fn try_find_by_username(&mut self, username: &str) -> HarnessResult<Option<UserRecord>> {
        let Some(schema) = self.db.schema().await? else {
            return Ok(None);
        };

        let sql = schema.select_user_sql();
        let user = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(username)
            .fetch_optional(self.db.connection())
            .await?;

        Ok(user)
    }

    async fn try_delete_by_username(&mut self, username: &str) -> HarnessResult<bool> {
        let Some(schema) = self.db.schema().await? else {
            return Ok(false);
        };

        let mut tx = self.db.connection().begin().await?;

        match cascade_delete(&mut tx, &schema, username).await {
            Ok(deleted) => {
                tx.commit().await?;
                if deleted {
                    tracing::info!(username, "User deleted");
                }
                Ok(deleted)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Rollback failed");
                }
                Err(e)
            }
        }
    }
}

async fn cascade_delete(
    conn: &mut PgConnection,
    schema: &SchemaAdapter,
    username: &str,
) -> HarnessResult<bool> {
    let user_id = sqlx::query_scalar::<_, i64>(&schema.select_user_id_sql())
        .bind(username)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(user_id) = user_id else {
        tracing::debug!(username, "No such user, nothing to delete");
        return Ok(false);
    };

    if let Some(sql) = schema.delete_follows_sql() {
        let result = sqlx::query(&sql).bind(user_id).execute(&mut *conn).await?;
        tracing::debug!(user_id, rows = result.rows_affected(), "Follow edges deleted");
    }

    if let Some(sql) = schema.delete_messages_sql() {
        let result = sqlx::query(&sql).bind(user_id).execute(&mut *conn).await?;
        tracing::debug!(user_id, rows = result.rows_affected(), "Messages deleted");
    }

    let result = sqlx::query(&schema.delete_user_sql())
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}
