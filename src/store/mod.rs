//! Contact persistence contract.
//!
//! The engine only ever talks to a [`ContactRepository`]; the SQLite backend in
//! [`sqlite`] is the production implementation. Identifiers are minted by an
//! [`IdGenerator`] owned by the repository, so the engine never depends on how
//! the store assigns keys.

pub mod sqlite;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Opaque contact identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactId(Uuid);

impl ContactId {
    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse the external string form of an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidContactId`] if `raw` is not a UUID.
    pub fn parse(raw: &str) -> Result<Self, InvalidContactId> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| InvalidContactId(raw.to_owned()))
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for ContactId {
    type Err = InvalidContactId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A string that does not have the shape of a contact identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid contact id: {0:?}")]
pub struct InvalidContactId(pub String);

/// Source of fresh identifiers for inserted contacts.
pub trait IdGenerator: Send + Sync {
    /// Produce an identifier not used by any existing contact.
    fn next_id(&self) -> ContactId;
}

/// Random v4 UUID identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> ContactId {
        ContactId(Uuid::new_v4())
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// A persisted contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    /// Store-generated identifier.
    pub id: ContactId,
    /// Display name.
    pub name: String,
    /// Phone number, unique across the directory.
    pub phone: String,
    /// Country derived from the phone number.
    pub country: String,
    /// IANA timezone derived from the phone number.
    pub timezone: String,
    /// Referenced friends, in insertion order. May dangle.
    pub friends: Vec<ContactId>,
}

/// A contact about to be inserted; the repository assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    /// Display name.
    pub name: String,
    /// Phone number.
    pub phone: String,
    /// Country derived from the phone number.
    pub country: String,
    /// IANA timezone derived from the phone number.
    pub timezone: String,
    /// Referenced friends.
    pub friends: Vec<ContactId>,
}

impl NewContact {
    /// Attach the generated id, producing the stored document.
    pub fn with_id(self, id: ContactId) -> Contact {
        Contact {
            id,
            name: self.name,
            phone: self.phone,
            country: self.country,
            timezone: self.timezone,
            friends: self.friends,
        }
    }
}

/// Merge-patch for an existing contact. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactPatch {
    /// New display name.
    pub name: Option<String>,
    /// New phone number.
    pub phone: Option<String>,
    /// Country re-derived from the new phone.
    pub country: Option<String>,
    /// Timezone re-derived from the new phone.
    pub timezone: Option<String>,
    /// Replacement friends list.
    pub friends: Option<Vec<ContactId>>,
}

/// Exact-match predicate over stored contacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactFilter {
    /// Every contact.
    All,
    /// Contacts whose phone equals the given value.
    Phone(String),
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from a contact repository backend.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be decoded.
    #[error("corrupt contact row {id}: {reason}")]
    Corrupt {
        /// Raw id column of the offending row.
        id: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A value could not be encoded for storage.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Persistence operations consumed by the contact engine.
///
/// Every call is independent; implementations hold no per-request state and
/// make no atomicity promises across calls.
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Load one contact by id.
    async fn find_by_id(&self, id: &ContactId) -> Result<Option<Contact>, RepositoryError>;

    /// First contact matching `filter`, in store order.
    async fn find_one(&self, filter: &ContactFilter) -> Result<Option<Contact>, RepositoryError>;

    /// Number of contacts matching `filter`.
    async fn count_matching(&self, filter: &ContactFilter) -> Result<u64, RepositoryError>;

    /// Every contact whose id is in `ids`, in store order. Unknown ids are skipped.
    async fn find_many(&self, ids: &[ContactId]) -> Result<Vec<Contact>, RepositoryError>;

    /// Every contact, in store order.
    async fn find_all(&self) -> Result<Vec<Contact>, RepositoryError>;

    /// Insert a new contact and return its generated id.
    async fn insert(&self, contact: NewContact) -> Result<ContactId, RepositoryError>;

    /// Apply `patch` to the contact with `id` and return the updated document,
    /// or `None` when no contact has that id.
    async fn update_merge(
        &self,
        id: &ContactId,
        patch: &ContactPatch,
    ) -> Result<Option<Contact>, RepositoryError>;

    /// Delete the contact with `id`, returning how many rows were removed.
    async fn delete_one(&self, id: &ContactId) -> Result<u64, RepositoryError>;
}
