pub mod schema;

use sqlx::{Connection, PgConnection};
use std::time::Duration;

use crate::error::{HarnessError, HarnessResult};
use crate::infrastructure::config::Config;
use crate::infrastructure::retry::Backoff;

pub use schema::{FollowTable, MessageTable, SchemaAdapter, SchemaVariant, UserTable};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// One database connection, held for the length of a scenario.
///
/// The schema adapter is detected on first use and reused for every later
/// query on this connection.
pub struct DbSession {
    conn: PgConnection,
    adapter: Option<SchemaAdapter>,
}

impl DbSession {
    /// Connect with exponential backoff; fails for good once `backoff` is exhausted
    pub async fn connect(database_url: &str, backoff: &Backoff) -> HarnessResult<Self> {
        let result = backoff
            .retry(|attempt| async move {
                tracing::debug!(attempt, "Connecting to PostgreSQL");
                connect_once(database_url).await
            })
            .await;

        match result {
            Ok(conn) => {
                tracing::info!("Database connection established");
                Ok(Self {
                    conn,
                    adapter: None,
                })
            }
            Err(exhausted) => Err(HarnessError::ConnectionExhausted {
                attempts: exhausted.attempts,
                source: exhausted.last_error,
            }),
        }
    }

    pub async fn from_config(config: &Config) -> HarnessResult<Self> {
        Self::connect(&config.database_url(), &Backoff::default()).await
    }

    pub async fn check_connection(&mut self) -> bool {
        sqlx::query("SELECT 1")
            .fetch_one(&mut self.conn)
            .await
            .is_ok()
    }

    /// The schema adapter for this connection, probing `information_schema` the first time.
    ///
    /// `None` when neither a `users` nor a `user` table exists.
    pub async fn schema(&mut self) -> HarnessResult<Option<SchemaAdapter>> {
        if self.adapter.is_none() {
            self.adapter = SchemaAdapter::detect(&mut self.conn).await?;
            if let Some(adapter) = &self.adapter {
                tracing::info!(
                    variant = ?adapter.variant,
                    user_table = %adapter.users.name,
                    id_column = %adapter.users.id_column,
                    follow_table = adapter.follows.as_ref().map(|f| f.name.as_str()),
                    message_table = adapter.messages.as_ref().map(|m| m.name.as_str()),
                    "Schema detected"
                );
            }
        }
        Ok(self.adapter.clone())
    }

    pub fn connection(&mut self) -> &mut PgConnection {
        &mut self.conn
    }

    pub async fn close(self) -> HarnessResult<()> {
        self.conn.close().await?;
        Ok(())
    }
}

async fn connect_once(database_url: &str) -> Result<PgConnection, sqlx::Error> {
    match tokio::time::timeout(CONNECT_TIMEOUT, PgConnection::connect(database_url)).await {
        Ok(result) => result,
        Err(_) => Err(sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "timed out connecting to PostgreSQL",
        ))),
    }
}
