//! SQLite-backed contact repository.
//!
//! One `contacts` table; the friends list is a JSON array of id strings in a
//! TEXT column. The schema is applied inline via `include_str!` on open.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{trace, warn};

use super::{
    Contact, ContactFilter, ContactId, ContactPatch, ContactRepository, IdGenerator, NewContact,
    RepositoryError,
};

/// Row type returned by SQLite queries for contacts.
type ContactRow = (String, String, String, String, String, Option<String>);

const SELECT_BY_ID: &str =
    "SELECT id, name, phone, country, timezone, friends FROM contacts WHERE id = ?1";
const SELECT_FIRST: &str =
    "SELECT id, name, phone, country, timezone, friends FROM contacts ORDER BY seq LIMIT 1";
const SELECT_FIRST_BY_PHONE: &str = "SELECT id, name, phone, country, timezone, friends \
     FROM contacts WHERE phone = ?1 ORDER BY seq LIMIT 1";
const SELECT_MANY: &str = "SELECT id, name, phone, country, timezone, friends FROM contacts \
     WHERE id IN (SELECT value FROM json_each(?1)) ORDER BY seq";
const SELECT_ALL: &str =
    "SELECT id, name, phone, country, timezone, friends FROM contacts ORDER BY seq";

/// Contact repository over a SQLite pool.
pub struct SqliteContactRepository {
    pool: SqlitePool,
    ids: Arc<dyn IdGenerator>,
}

impl SqliteContactRepository {
    /// Open (or create) the database at `url` and apply the schema.
    ///
    /// In-memory URLs are pinned to a single connection so every query sees
    /// the same database.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the database cannot be opened,
    /// or the migration fails.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        ids: Arc<dyn IdGenerator>,
    ) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("invalid database url {url}"))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .pragma("trusted_schema", "OFF");

        let max_connections = if url.contains(":memory:") {
            1
        } else {
            max_connections.max(1)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open contact store at {url}"))?;

        Self::from_pool(pool, ids)
            .await
            .context("failed to apply contacts schema migration")
    }

    /// Wrap an existing pool and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Database`] if the migration fails.
    pub async fn from_pool(
        pool: SqlitePool,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self, RepositoryError> {
        let migration_sql = include_str!("../../migrations/001_contacts.sql");
        sqlx::raw_sql(migration_sql).execute(&pool).await?;
        Ok(Self { pool, ids })
    }

    /// The underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ContactRepository for SqliteContactRepository {
    async fn find_by_id(&self, id: &ContactId) -> Result<Option<Contact>, RepositoryError> {
        let row: Option<ContactRow> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(decode_row).transpose()
    }

    async fn find_one(&self, filter: &ContactFilter) -> Result<Option<Contact>, RepositoryError> {
        let row: Option<ContactRow> = match filter {
            ContactFilter::All => {
                sqlx::query_as(SELECT_FIRST)
                    .fetch_optional(&self.pool)
                    .await?
            }
            ContactFilter::Phone(phone) => {
                sqlx::query_as(SELECT_FIRST_BY_PHONE)
                    .bind(phone)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };
        row.map(decode_row).transpose()
    }

    async fn count_matching(&self, filter: &ContactFilter) -> Result<u64, RepositoryError> {
        let (count,): (i64,) = match filter {
            ContactFilter::All => {
                sqlx::query_as("SELECT COUNT(*) FROM contacts")
                    .fetch_one(&self.pool)
                    .await?
            }
            ContactFilter::Phone(phone) => {
                sqlx::query_as("SELECT COUNT(*) FROM contacts WHERE phone = ?1")
                    .bind(phone)
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn find_many(&self, ids: &[ContactId]) -> Result<Vec<Contact>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        // One JSON parameter keeps large friend lists under SQLite's bind limit.
        let rows: Vec<ContactRow> = sqlx::query_as(SELECT_MANY)
            .bind(encode_friends(ids)?)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(decode_row).collect()
    }

    async fn find_all(&self) -> Result<Vec<Contact>, RepositoryError> {
        let rows: Vec<ContactRow> = sqlx::query_as(SELECT_ALL)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(decode_row).collect()
    }

    async fn insert(&self, contact: NewContact) -> Result<ContactId, RepositoryError> {
        let id = self.ids.next_id();
        let friends = encode_friends(&contact.friends)?;
        sqlx::query(
            "INSERT INTO contacts (id, name, phone, country, timezone, friends) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(id.to_string())
        .bind(&contact.name)
        .bind(&contact.phone)
        .bind(&contact.country)
        .bind(&contact.timezone)
        .bind(friends)
        .execute(&self.pool)
        .await?;
        trace!(contact_id = %id, "contact row inserted");
        Ok(id)
    }

    async fn update_merge(
        &self,
        id: &ContactId,
        patch: &ContactPatch,
    ) -> Result<Option<Contact>, RepositoryError> {
        let friends = patch.friends.as_deref().map(encode_friends).transpose()?;
        let row: Option<ContactRow> = sqlx::query_as(
            "UPDATE contacts SET \
               name = COALESCE(?1, name), \
               phone = COALESCE(?2, phone), \
               country = COALESCE(?3, country), \
               timezone = COALESCE(?4, timezone), \
               friends = COALESCE(?5, friends) \
             WHERE id = ?6 \
             RETURNING id, name, phone, country, timezone, friends",
        )
        .bind(patch.name.as_deref())
        .bind(patch.phone.as_deref())
        .bind(patch.country.as_deref())
        .bind(patch.timezone.as_deref())
        .bind(friends)
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(decode_row).transpose()
    }

    async fn delete_one(&self, id: &ContactId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn encode_friends(friends: &[ContactId]) -> Result<String, RepositoryError> {
    let raw: Vec<String> = friends.iter().map(ToString::to_string).collect();
    Ok(serde_json::to_string(&raw)?)
}

/// Decode a friends column. Anything that is not a JSON array reads as empty;
/// entries that are not valid ids are dropped.
fn decode_friends(owner: &str, raw: Option<&str>) -> Vec<ContactId> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<serde_json::Value>>(raw) {
        Ok(entries) => entries
            .iter()
            .filter_map(serde_json::Value::as_str)
            .filter_map(|entry| ContactId::parse(entry).ok())
            .collect(),
        Err(e) => {
            warn!(contact_id = owner, error = %e, "malformed friends column, treating as empty");
            Vec::new()
        }
    }
}

fn decode_row(row: ContactRow) -> Result<Contact, RepositoryError> {
    let (raw_id, name, phone, country, timezone, friends) = row;
    let id = ContactId::parse(&raw_id).map_err(|e| RepositoryError::Corrupt {
        id: raw_id.clone(),
        reason: e.to_string(),
    })?;
    let friends = decode_friends(&raw_id, friends.as_deref());
    Ok(Contact {
        id,
        name,
        phone,
        country,
        timezone,
        friends,
    })
}
