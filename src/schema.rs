//! Schema contract: operations, argument shapes and the `Contact` shape.
//!
//! Requests are checked here before any resolver runs, so the engine can
//! trust argument presence and types.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::engine::{AddContact, ContactError, UpdateContact};

/// Schema definition served to clients.
pub const SCHEMA_SDL: &str = r#"type Contact {
  id: ID!
  name: String!
  phone: String!
  country: String!
  time: String!
  friends: [Contact!]!
}

type Query {
  getContact(id: ID!): Contact
  getContacts: [Contact!]!
}

type Mutation {
  addContact(name: String!, phone: String!, friends: [ID!]): Contact!
  updateContact(id: ID!, name: String, phone: String, friends: [ID!]): Contact!
  deleteContact(id: ID!): Boolean!
}
"#;

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// What an operation hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    /// `Contact` (nullable).
    OptionalContact,
    /// `Contact!`.
    Contact,
    /// `[Contact!]!`.
    ContactList,
    /// `Boolean!`.
    Boolean,
}

impl ReturnShape {
    /// Whether the result is a contact (and so needs a selection).
    pub fn is_contact(&self) -> bool {
        !matches!(self, Self::Boolean)
    }

    /// Whether a failure may null just this field rather than the whole result.
    pub fn is_nullable(&self) -> bool {
        matches!(self, Self::OptionalContact)
    }
}

/// A named operation with validated arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// `getContact(id)`.
    GetContact {
        /// Contact id.
        id: String,
    },
    /// `getContacts`.
    GetContacts,
    /// `addContact(name, phone, friends?)`.
    AddContact(AddContact),
    /// `updateContact(id, name?, phone?, friends?)`.
    UpdateContact(UpdateContact),
    /// `deleteContact(id)`.
    DeleteContact {
        /// Contact id.
        id: String,
    },
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct IdArgs {
    id: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AddArgs {
    name: String,
    phone: String,
    #[serde(default)]
    friends: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateArgs {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    friends: Option<Vec<String>>,
}

impl Operation {
    /// Resolve an operation name and its raw arguments.
    ///
    /// # Errors
    ///
    /// [`ContactError::Validation`] for an unknown operation, unknown or
    /// missing arguments, or arguments of the wrong type.
    pub fn parse(
        name: &str,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, ContactError> {
        match name {
            "getContact" => {
                let args: IdArgs = decode_args(name, arguments)?;
                Ok(Self::GetContact { id: args.id })
            }
            "getContacts" => {
                let _: NoArgs = decode_args(name, arguments)?;
                Ok(Self::GetContacts)
            }
            "addContact" => {
                let args: AddArgs = decode_args(name, arguments)?;
                Ok(Self::AddContact(AddContact {
                    name: args.name,
                    phone: args.phone,
                    friends: args.friends,
                }))
            }
            "updateContact" => {
                let args: UpdateArgs = decode_args(name, arguments)?;
                Ok(Self::UpdateContact(UpdateContact {
                    id: args.id,
                    name: args.name,
                    phone: args.phone,
                    friends: args.friends,
                }))
            }
            "deleteContact" => {
                let args: IdArgs = decode_args(name, arguments)?;
                Ok(Self::DeleteContact { id: args.id })
            }
            other => Err(ContactError::Validation(format!(
                "unknown operation {other:?}"
            ))),
        }
    }

    /// Schema name of the operation.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetContact { .. } => "getContact",
            Self::GetContacts => "getContacts",
            Self::AddContact(_) => "addContact",
            Self::UpdateContact(_) => "updateContact",
            Self::DeleteContact { .. } => "deleteContact",
        }
    }

    /// Declared result type.
    pub fn return_shape(&self) -> ReturnShape {
        match self {
            Self::GetContact { .. } => ReturnShape::OptionalContact,
            Self::GetContacts => ReturnShape::ContactList,
            Self::AddContact(_) | Self::UpdateContact(_) => ReturnShape::Contact,
            Self::DeleteContact { .. } => ReturnShape::Boolean,
        }
    }
}

fn decode_args<T: DeserializeOwned>(
    operation: &str,
    arguments: serde_json::Map<String, serde_json::Value>,
) -> Result<T, ContactError> {
    serde_json::from_value(serde_json::Value::Object(arguments)).map_err(|e| {
        ContactError::Validation(format!("invalid arguments for {operation}: {e}"))
    })
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Fields of the `Contact` type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactField {
    /// `id: ID!`
    Id,
    /// `name: String!`
    Name,
    /// `phone: String!`
    Phone,
    /// `country: String!`
    Country,
    /// `time: String!` (computed)
    Time,
    /// `friends: [Contact!]!` (computed)
    Friends,
}

impl ContactField {
    /// Look up a field by schema name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            "phone" => Some(Self::Phone),
            "country" => Some(Self::Country),
            "time" => Some(Self::Time),
            "friends" => Some(Self::Friends),
            _ => None,
        }
    }

    /// Schema name of the field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Phone => "phone",
            Self::Country => "country",
            Self::Time => "time",
            Self::Friends => "friends",
        }
    }

    /// Whether the field is an object that needs a nested selection.
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Friends)
    }
}

/// One raw selection entry: a field name or `{ "friends": [...] }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SelectionItem {
    /// A scalar field.
    Field(String),
    /// A composite field with its nested selection.
    Nested(BTreeMap<String, Vec<SelectionItem>>),
}

/// A validated field selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedField {
    /// The selected field.
    pub field: ContactField,
    /// Nested selection; non-empty only for composite fields.
    pub selection: Vec<SelectedField>,
}

/// Validate a raw selection against the `Contact` type.
///
/// `max_depth` bounds how many `friends` levels may be nested below the root.
/// A field listed more than once is kept once; repeated `friends` entries
/// have their nested selections merged.
///
/// # Errors
///
/// [`ContactError::Validation`] for an empty selection, unknown fields,
/// scalars given a sub-selection, composites without one, or nesting beyond
/// `max_depth`.
pub fn validate_selection(
    items: &[SelectionItem],
    max_depth: usize,
) -> Result<Vec<SelectedField>, ContactError> {
    validate_level(items, 0, max_depth)
}

fn validate_level(
    items: &[SelectionItem],
    depth: usize,
    max_depth: usize,
) -> Result<Vec<SelectedField>, ContactError> {
    if items.is_empty() {
        return Err(ContactError::Validation(
            "selection on Contact must not be empty".to_owned(),
        ));
    }
    // Repeated fields collapse into one entry; composite copies pool their
    // nested items so each field resolves once per node.
    let mut grouped: Vec<(ContactField, Vec<SelectionItem>)> = Vec::with_capacity(items.len());
    for item in items {
        match item {
            SelectionItem::Field(name) => {
                let field = lookup_field(name)?;
                if field.is_composite() {
                    return Err(ContactError::Validation(format!(
                        "field {name:?} of type [Contact!]! must have a selection"
                    )));
                }
                if !grouped.iter().any(|(seen, _)| *seen == field) {
                    grouped.push((field, Vec::new()));
                }
            }
            SelectionItem::Nested(map) => {
                for (name, nested) in map {
                    let field = lookup_field(name)?;
                    if !field.is_composite() {
                        return Err(ContactError::Validation(format!(
                            "field {name:?} is a scalar and takes no selection"
                        )));
                    }
                    if nested.is_empty() {
                        return Err(ContactError::Validation(
                            "selection on Contact must not be empty".to_owned(),
                        ));
                    }
                    if depth.saturating_add(1) > max_depth {
                        return Err(ContactError::Validation(format!(
                            "selection exceeds maximum depth of {max_depth}"
                        )));
                    }
                    match grouped.iter_mut().find(|(seen, _)| *seen == field) {
                        Some((_, pooled)) => pooled.extend(nested.iter().cloned()),
                        None => grouped.push((field, nested.clone())),
                    }
                }
            }
        }
    }

    grouped
        .into_iter()
        .map(|(field, nested)| {
            let selection = if field.is_composite() {
                validate_level(&nested, depth.saturating_add(1), max_depth)?
            } else {
                Vec::new()
            };
            Ok(SelectedField { field, selection })
        })
        .collect()
}

fn lookup_field(name: &str) -> Result<ContactField, ContactError> {
    ContactField::from_name(name).ok_or_else(|| {
        ContactError::Validation(format!("unknown field {name:?} on type Contact"))
    })
}
