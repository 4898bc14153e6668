//! Contact resolution engine.
//!
//! Implements the five directory operations and the computed `Contact`
//! fields on top of a [`ContactRepository`] and a [`PhoneService`].
//!
//! # Consistency
//!
//! Phone uniqueness and existence are checked with a read before the write.
//! Nothing here is transactional: two concurrent `add_contact` calls for the
//! same phone can both pass the check, and a delete racing an update can make
//! the update report [`ContactError::NotFound`].

pub mod error;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::phone::{PhoneService, PhoneValidation};
use crate::store::{Contact, ContactFilter, ContactId, ContactPatch, ContactRepository, NewContact};

pub use self::error::{ContactError, ErrorKind};

/// Arguments of `addContact`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddContact {
    /// Display name.
    pub name: String,
    /// Phone number to validate and store.
    pub phone: String,
    /// Friend ids in external string form.
    pub friends: Option<Vec<String>>,
}

/// Arguments of `updateContact`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateContact {
    /// Target contact id in external string form.
    pub id: String,
    /// New display name.
    pub name: Option<String>,
    /// New phone number; re-derives country and timezone.
    pub phone: Option<String>,
    /// Replacement friend ids.
    pub friends: Option<Vec<String>>,
}

/// Stateless resolver for contact operations and fields.
pub struct ContactEngine {
    contacts: Arc<dyn ContactRepository>,
    phone: Arc<dyn PhoneService>,
}

impl ContactEngine {
    /// Build an engine over a repository and a ready phone client.
    pub fn new(contacts: Arc<dyn ContactRepository>, phone: Arc<dyn PhoneService>) -> Self {
        Self { contacts, phone }
    }

    /// Look up one contact. An unknown id is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// [`ContactError::Validation`] for a malformed id,
    /// [`ContactError::Storage`] if the store fails.
    pub async fn get_contact(&self, id: &str) -> Result<Option<Contact>, ContactError> {
        let id = ContactId::parse(id)?;
        let contact = self.contacts.find_by_id(&id).await?;
        debug!(contact_id = %id, found = contact.is_some(), "get_contact");
        Ok(contact)
    }

    /// Every contact, in store order.
    ///
    /// # Errors
    ///
    /// [`ContactError::Storage`] if the store fails.
    pub async fn get_contacts(&self) -> Result<Vec<Contact>, ContactError> {
        let contacts = self.contacts.find_all().await?;
        debug!(count = contacts.len(), "get_contacts");
        Ok(contacts)
    }

    /// Create a contact, deriving country and timezone from its phone.
    ///
    /// The validator's `is_valid` flag is not consulted here, unlike in
    /// [`ContactEngine::update_contact`].
    ///
    /// # Errors
    ///
    /// - [`ContactError::Validation`] for a blank name/phone or malformed friend id
    /// - [`ContactError::Configuration`] when the phone client has no key
    /// - [`ContactError::Conflict`] when the phone is already taken
    /// - [`ContactError::ExternalService`] when validation fails or yields no timezone
    pub async fn add_contact(&self, input: AddContact) -> Result<Contact, ContactError> {
        let AddContact {
            name,
            phone,
            friends,
        } = input;
        if name.trim().is_empty() {
            return Err(ContactError::Validation("name must not be empty".to_owned()));
        }
        if phone.trim().is_empty() {
            return Err(ContactError::Validation("phone must not be empty".to_owned()));
        }

        self.require_credential()?;

        let existing = self
            .contacts
            .count_matching(&ContactFilter::Phone(phone.clone()))
            .await?;
        if existing >= 1 {
            warn!(phone = %phone, "add_contact rejected: phone exists");
            return Err(ContactError::Conflict(format!("phone {phone} already exists")));
        }

        let validation = self.phone.validate_phone(&phone).await?;
        let timezone = primary_timezone(&validation, &phone)?;
        let friends = parse_friend_ids(friends)?;

        let document = NewContact {
            name,
            phone,
            country: validation.country,
            timezone,
            friends,
        };
        let id = self.contacts.insert(document.clone()).await?;
        info!(contact_id = %id, "contact added");
        Ok(document.with_id(id))
    }

    /// Merge-patch an existing contact.
    ///
    /// The phone client must hold a key even when the phone is unchanged.
    ///
    /// # Errors
    ///
    /// - [`ContactError::Validation`] when nothing is supplied, an id is
    ///   malformed, or the validator reports the new phone as invalid
    /// - [`ContactError::Configuration`] when the phone client has no key
    /// - [`ContactError::Conflict`] when another contact holds the new phone
    /// - [`ContactError::ExternalService`] when validation fails
    /// - [`ContactError::NotFound`] when no contact has the id
    pub async fn update_contact(&self, input: UpdateContact) -> Result<Contact, ContactError> {
        let UpdateContact {
            id: raw_id,
            name,
            phone,
            friends,
        } = input;
        let name = name.filter(|n| !n.trim().is_empty());
        let phone = phone.filter(|p| !p.trim().is_empty());
        if name.is_none() && phone.is_none() && friends.is_none() {
            return Err(ContactError::Validation(
                "at least one of name, phone or friends must be updated".to_owned(),
            ));
        }

        self.require_credential()?;
        let id = ContactId::parse(&raw_id)?;

        let mut patch = ContactPatch {
            name,
            friends: friends.map(|f| parse_friend_ids(Some(f))).transpose()?,
            ..ContactPatch::default()
        };

        if let Some(phone) = phone {
            let holder = self
                .contacts
                .find_one(&ContactFilter::Phone(phone.clone()))
                .await?;
            if let Some(holder) = holder.filter(|h| h.id != id) {
                warn!(contact_id = %id, holder = %holder.id, "update_contact rejected: phone taken");
                return Err(ContactError::Conflict(format!("phone {phone} already taken")));
            }

            let validation = self.phone.validate_phone(&phone).await?;
            if !validation.is_valid {
                return Err(ContactError::Validation(format!(
                    "phone {phone} is not a valid number"
                )));
            }
            patch.timezone = Some(primary_timezone(&validation, &phone)?);
            patch.country = Some(validation.country);
            patch.phone = Some(phone);
        }

        match self.contacts.update_merge(&id, &patch).await? {
            Some(updated) => {
                info!(contact_id = %id, "contact updated");
                Ok(updated)
            }
            None => Err(ContactError::NotFound(format!("contact {id} not found"))),
        }
    }

    /// Hard-delete a contact. Returns whether exactly one contact was removed.
    ///
    /// Friends lists of other contacts are not touched.
    ///
    /// # Errors
    ///
    /// [`ContactError::Validation`] for a malformed id,
    /// [`ContactError::Storage`] if the store fails.
    pub async fn delete_contact(&self, id: &str) -> Result<bool, ContactError> {
        let id = ContactId::parse(id)?;
        let deleted = self.contacts.delete_one(&id).await?;
        info!(contact_id = %id, deleted, "delete_contact");
        Ok(deleted == 1)
    }

    /// External string form of a contact's id.
    pub fn resolve_id(contact: &Contact) -> String {
        contact.id.to_string()
    }

    /// Current local time at the contact's timezone, fetched on every call.
    ///
    /// # Errors
    ///
    /// [`ContactError::Configuration`] without a key,
    /// [`ContactError::ExternalService`] when the lookup fails.
    pub async fn resolve_time(&self, contact: &Contact) -> Result<String, ContactError> {
        self.require_credential()?;
        let time = self.phone.lookup_time(&contact.timezone).await?;
        Ok(time.datetime)
    }

    /// The contact's friends that still exist, in store order.
    ///
    /// # Errors
    ///
    /// [`ContactError::Storage`] if the store fails.
    pub async fn resolve_friends(&self, contact: &Contact) -> Result<Vec<Contact>, ContactError> {
        if contact.friends.is_empty() {
            return Ok(Vec::new());
        }
        let friends = self.contacts.find_many(&contact.friends).await?;
        if friends.len() < contact.friends.len() {
            debug!(
                contact_id = %contact.id,
                referenced = contact.friends.len(),
                resolved = friends.len(),
                "dropping unresolved friend references"
            );
        }
        Ok(friends)
    }

    fn require_credential(&self) -> Result<(), ContactError> {
        self.phone.ensure_credential().map_err(ContactError::from)
    }
}

fn primary_timezone(validation: &PhoneValidation, phone: &str) -> Result<String, ContactError> {
    validation
        .primary_timezone()
        .map(str::to_owned)
        .ok_or_else(|| {
            ContactError::ExternalService(format!("phone service returned no timezone for {phone}"))
        })
}

fn parse_friend_ids(friends: Option<Vec<String>>) -> Result<Vec<ContactId>, ContactError> {
    friends
        .unwrap_or_default()
        .iter()
        .map(|raw| ContactId::parse(raw).map_err(ContactError::from))
        .collect()
}
