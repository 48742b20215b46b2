//! Schema adapter for the MiniTwit database.
//!
//! Deployments of MiniTwit disagree on naming: some keep a singular `user`
//! table keyed by `id`, ORM-backed ones use plural tables keyed by `user_id`.
//! The adapter probes `information_schema` once, records which shape it
//! found, and builds every later statement from that record.

use serde::Serialize;
use sqlx::PgConnection;

use crate::error::HarnessResult;

/// Candidate table names, most preferred first
pub const USER_TABLES: [&str; 2] = ["users", "user"];
pub const FOLLOW_TABLES: [&str; 2] = ["followers", "follower"];
pub const MESSAGE_TABLES: [&str; 2] = ["messages", "message"];

/// Known shapes of the schema
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SchemaVariant {
    /// `user` table keyed by `id`
    Legacy,
    /// `users` table keyed by `user_id`
    Gorm,
    /// Any other combination
    Hybrid,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserTable {
    pub name: String,
    pub id_column: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FollowTable {
    pub name: String,
    pub follower_column: String,
    pub followed_column: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MessageTable {
    pub name: String,
    pub author_column: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SchemaAdapter {
    pub variant: SchemaVariant,
    pub users: UserTable,
    pub follows: Option<FollowTable>,
    pub messages: Option<MessageTable>,
}

impl SchemaAdapter {
    /// Probe the current schema. `None` when no user table exists.
    pub async fn detect(conn: &mut PgConnection) -> HarnessResult<Option<Self>> {
        let Some(user_table) = first_existing(conn, &USER_TABLES).await? else {
            tracing::warn!("No users or user table found");
            return Ok(None);
        };
        let user_columns = table_columns(conn, user_table).await?;

        let follow = match first_existing(conn, &FOLLOW_TABLES).await? {
            Some(name) => Some((name, table_columns(conn, name).await?)),
            None => None,
        };
        let message = match first_existing(conn, &MESSAGE_TABLES).await? {
            Some(name) => Some((name, table_columns(conn, name).await?)),
            None => None,
        };

        Ok(Some(Self::from_columns(
            (user_table, &user_columns),
            follow.as_ref().map(|(n, c)| (*n, c.as_slice())),
            message.as_ref().map(|(n, c)| (*n, c.as_slice())),
        )))
    }

    /// Build an adapter from table names and their column lists.
    ///
    /// A follow or message table whose key columns cannot be identified is
    /// treated as absent.
    pub fn from_columns(
        user_table: (&str, &[String]),
        follow_table: Option<(&str, &[String])>,
        message_table: Option<(&str, &[String])>,
    ) -> Self {
        let (user_name, user_columns) = user_table;
        let users = UserTable {
            name: user_name.to_string(),
            id_column: pick_id_column(user_columns).to_string(),
        };

        let follows = follow_table.and_then(|(name, columns)| {
            let follower = find_column(columns, |c| {
                c.contains("follower") || (c.contains("who") && !c.contains("whom"))
            })?;
            let followed = find_column(columns, |c| c.contains("whom") || c.contains("followed"))?;
            Some(FollowTable {
                name: name.to_string(),
                follower_column: follower,
                followed_column: followed,
            })
        });
        if follow_table.is_some() && follows.is_none() {
            tracing::warn!("Follow table has no recognisable who/whom columns, skipping it");
        }

        let messages = message_table.and_then(|(name, columns)| {
            let author = find_column(columns, |c| c.contains("author"))
                .or_else(|| find_column(columns, |c| c.contains("user")))?;
            Some(MessageTable {
                name: name.to_string(),
                author_column: author,
            })
        });

        let variant = match (users.name.as_str(), users.id_column.as_str()) {
            ("user", "id") => SchemaVariant::Legacy,
            ("users", "user_id") => SchemaVariant::Gorm,
            _ => SchemaVariant::Hybrid,
        };

        Self {
            variant,
            users,
            follows,
            messages,
        }
    }

    pub fn select_user_sql(&self) -> String {
        format!(
            "SELECT CAST({id} AS BIGINT) AS id, username, email FROM {table} WHERE username = $1",
            id = quote_ident(&self.users.id_column),
            table = quote_ident(&self.users.name),
        )
    }

    pub fn select_user_id_sql(&self) -> String {
        format!(
            "SELECT CAST({id} AS BIGINT) FROM {table} WHERE username = $1",
            id = quote_ident(&self.users.id_column),
            table = quote_ident(&self.users.name),
        )
    }

    pub fn delete_follows_sql(&self) -> Option<String> {
        self.follows.as_ref().map(|f| {
            format!(
                "DELETE FROM {table} WHERE {who} = $1 OR {whom} = $1",
                table = quote_ident(&f.name),
                who = quote_ident(&f.follower_column),
                whom = quote_ident(&f.followed_column),
            )
        })
    }

    pub fn delete_messages_sql(&self) -> Option<String> {
        self.messages.as_ref().map(|m| {
            format!(
                "DELETE FROM {table} WHERE {author} = $1",
                table = quote_ident(&m.name),
                author = quote_ident(&m.author_column),
            )
        })
    }

    pub fn delete_user_sql(&self) -> String {
        format!(
            "DELETE FROM {table} WHERE {id} = $1",
            table = quote_ident(&self.users.name),
            id = quote_ident(&self.users.id_column),
        )
    }
}

fn pick_id_column(columns: &[String]) -> &'static str {
    if columns.iter().any(|c| c == "user_id") {
        "user_id"
    } else {
        "id"
    }
}

fn find_column(columns: &[String], matches: impl Fn(&str) -> bool) -> Option<String> {
    columns
        .iter()
        .find(|c| matches(&c.to_lowercase()))
        .cloned()
}

/// Double-quote an identifier so reserved words like `user` are usable
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

async fn first_existing(
    conn: &mut PgConnection,
    candidates: &[&'static str],
) -> HarnessResult<Option<&'static str>> {
    for name in candidates {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name = $1)",
        )
        .bind(*name)
        .fetch_one(&mut *conn)
        .await?;

        if exists {
            return Ok(Some(*name));
        }
    }
    Ok(None)
}

async fn table_columns(conn: &mut PgConnection, table: &str) -> HarnessResult<Vec<String>> {
    let columns = sqlx::query_scalar::<_, String>(
        "SELECT column_name::text FROM information_schema.columns \
         WHERE table_schema = current_schema() AND table_name = $1 \
         ORDER BY ordinal_position",
    )
    .bind(table)
    .fetch_all(&mut *conn)
    .await?;

    Ok(columns)
}
