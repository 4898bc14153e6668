//! Shared fixtures: a recording phone service stub and in-memory stores.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use agenda::engine::{AddContact, ContactEngine};
use agenda::phone::{PhoneService, PhoneServiceError, PhoneValidation, WorldTime};
use agenda::store::sqlite::SqliteContactRepository;
use agenda::store::{
    Contact, ContactFilter, ContactId, ContactPatch, ContactRepository, NewContact,
    RepositoryError, UuidGenerator,
};

pub const DEFAULT_DATETIME: &str = "2026-10-16 09:30:00";

/// A call made against the stub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhoneCall {
    Validate(String),
    Time(String),
}

/// In-process phone service with canned answers.
pub struct StubPhoneService {
    credential: bool,
    default_validation: PhoneValidation,
    validations: HashMap<String, PhoneValidation>,
    validate_status: Option<u16>,
    time_status: Option<u16>,
    times: HashMap<String, String>,
    calls: Mutex<Vec<PhoneCall>>,
}

impl StubPhoneService {
    pub fn new() -> Self {
        Self {
            credential: true,
            default_validation: validation("US", &["America/New_York"], true),
            validations: HashMap::new(),
            validate_status: None,
            time_status: None,
            times: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn without_credential(mut self) -> Self {
        self.credential = false;
        self
    }

    pub fn with_validation(mut self, phone: &str, answer: PhoneValidation) -> Self {
        self.validations.insert(phone.to_owned(), answer);
        self
    }

    pub fn failing_validation(mut self, status: u16) -> Self {
        self.validate_status = Some(status);
        self
    }

    pub fn failing_time(mut self, status: u16) -> Self {
        self.time_status = Some(status);
        self
    }

    pub fn with_time(mut self, timezone: &str, datetime: &str) -> Self {
        self.times.insert(timezone.to_owned(), datetime.to_owned());
        self
    }

    pub fn calls(&self) -> Vec<PhoneCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn time_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                PhoneCall::Time(tz) => Some(tz),
                PhoneCall::Validate(_) => None,
            })
            .collect()
    }

    pub fn validate_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, PhoneCall::Validate(_)))
            .count()
    }

    fn record(&self, call: PhoneCall) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

#[async_trait]
impl PhoneService for StubPhoneService {
    fn ensure_credential(&self) -> Result<(), PhoneServiceError> {
        if self.credential {
            Ok(())
        } else {
            Err(PhoneServiceError::MissingCredential)
        }
    }

    async fn validate_phone(&self, number: &str) -> Result<PhoneValidation, PhoneServiceError> {
        self.ensure_credential()?;
        self.record(PhoneCall::Validate(number.to_owned()));
        if let Some(status) = self.validate_status {
            return Err(PhoneServiceError::ServiceUnavailable { status });
        }
        Ok(self
            .validations
            .get(number)
            .cloned()
            .unwrap_or_else(|| self.default_validation.clone()))
    }

    async fn lookup_time(&self, timezone: &str) -> Result<WorldTime, PhoneServiceError> {
        self.ensure_credential()?;
        self.record(PhoneCall::Time(timezone.to_owned()));
        if let Some(status) = self.time_status {
            return Err(PhoneServiceError::ServiceUnavailable { status });
        }
        let datetime = self
            .times
            .get(timezone)
            .cloned()
            .unwrap_or_else(|| DEFAULT_DATETIME.to_owned());
        Ok(WorldTime { datetime })
    }
}

pub fn validation(country: &str, timezones: &[&str], is_valid: bool) -> PhoneValidation {
    PhoneValidation {
        is_valid,
        country: country.to_owned(),
        timezones: timezones.iter().map(|tz| (*tz).to_owned()).collect(),
    }
}

/// Repository wrapper that counts batch lookups.
pub struct CountingRepository {
    inner: SqliteContactRepository,
    find_many_calls: AtomicUsize,
}

impl CountingRepository {
    pub fn find_many_calls(&self) -> usize {
        self.find_many_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContactRepository for CountingRepository {
    async fn find_by_id(&self, id: &ContactId) -> Result<Option<Contact>, RepositoryError> {
        self.inner.find_by_id(id).await
    }

    async fn find_one(&self, filter: &ContactFilter) -> Result<Option<Contact>, RepositoryError> {
        self.inner.find_one(filter).await
    }

    async fn count_matching(&self, filter: &ContactFilter) -> Result<u64, RepositoryError> {
        self.inner.count_matching(filter).await
    }

    async fn find_many(&self, ids: &[ContactId]) -> Result<Vec<Contact>, RepositoryError> {
        self.find_many_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_many(ids).await
    }

    async fn find_all(&self) -> Result<Vec<Contact>, RepositoryError> {
        self.inner.find_all().await
    }

    async fn insert(&self, contact: NewContact) -> Result<ContactId, RepositoryError> {
        self.inner.insert(contact).await
    }

    async fn update_merge(
        &self,
        id: &ContactId,
        patch: &ContactPatch,
    ) -> Result<Option<Contact>, RepositoryError> {
        self.inner.update_merge(id, patch).await
    }

    async fn delete_one(&self, id: &ContactId) -> Result<u64, RepositoryError> {
        self.inner.delete_one(id).await
    }
}

pub async fn memory_pool() -> SqlitePool {
    let opts = SqliteConnectOptions::new()
        .filename(":memory:")
        .create_if_missing(true);
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await
        .expect("pool should connect")
}

pub async fn memory_repository() -> SqliteContactRepository {
    SqliteContactRepository::from_pool(memory_pool().await, Arc::new(UuidGenerator))
        .await
        .expect("schema should apply")
}

/// Engine wired to an in-memory store and the given stub.
pub struct Harness {
    pub engine: Arc<ContactEngine>,
    pub phone: Arc<StubPhoneService>,
    pub contacts: Arc<CountingRepository>,
}

pub async fn harness(phone: StubPhoneService) -> Harness {
    let phone = Arc::new(phone);
    let contacts = Arc::new(CountingRepository {
        inner: memory_repository().await,
        find_many_calls: AtomicUsize::new(0),
    });
    let engine = Arc::new(ContactEngine::new(
        Arc::clone(&contacts) as Arc<dyn ContactRepository>,
        Arc::clone(&phone) as Arc<dyn PhoneService>,
    ));
    Harness {
        engine,
        phone,
        contacts,
    }
}

pub fn new_contact(name: &str, phone: &str) -> AddContact {
    AddContact {
        name: name.to_owned(),
        phone: phone.to_owned(),
        friends: None,
    }
}

pub fn unknown_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
