//! Field-selection executor.
//!
//! Takes a [`QueryRequest`] (operation name, arguments, selection), checks it
//! against the [`schema`](crate::schema), runs the operation on the
//! [`ContactEngine`] and resolves the selected fields of every returned
//! contact. Computed fields (`time`, `friends`) are resolved per node, so a
//! nested friends selection issues one time lookup per contact visited.
//!
//! Every `Contact` field is non-null: the first failing field nulls its
//! root field. `getContact` is nullable and so becomes `null` in `data`; any
//! other root failing makes `data` itself `null`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::engine::{ContactEngine, ContactError};
use crate::schema::{
    validate_selection, ContactField, Operation, ReturnShape, SelectedField, SelectionItem,
};
use crate::store::Contact;

/// Default limit on nested `friends` levels.
pub const DEFAULT_MAX_DEPTH: usize = 6;

/// An operation request as received from a client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryRequest {
    /// Operation name, e.g. `getContact`.
    pub operation: String,
    /// Named arguments.
    #[serde(default)]
    pub arguments: Map<String, Value>,
    /// Fields to return for contact results.
    #[serde(default)]
    pub selection: Vec<SelectionItem>,
}

/// One step in the path to a failing field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Object key.
    Key(String),
    /// List index.
    Index(usize),
}

/// An error reported alongside (or instead of) data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryError {
    /// Human-readable message.
    pub message: String,
    /// Stable error code.
    pub code: &'static str,
    /// Path to the field that failed.
    pub path: Vec<PathSegment>,
    /// HTTP status suggested by the error kind.
    #[serde(skip)]
    pub status: u16,
}

impl QueryError {
    fn new(err: &ContactError, path: Vec<PathSegment>) -> Self {
        let kind = err.kind();
        Self {
            message: err.to_string(),
            code: kind.code(),
            path,
            status: kind.http_status(),
        }
    }
}

/// Result of executing a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    /// Resolved data, keyed by operation name; `null` on a non-null failure.
    pub data: Option<Value>,
    /// Errors raised while validating or resolving.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<QueryError>,
}

impl QueryResponse {
    /// Suggested HTTP status: 200 when data is present, else the first error's.
    pub fn status(&self) -> u16 {
        match (&self.data, self.errors.first()) {
            (None, Some(err)) => err.status,
            _ => 200,
        }
    }

    fn failed(err: &ContactError, path: Vec<PathSegment>) -> Self {
        Self {
            data: None,
            errors: vec![QueryError::new(err, path)],
        }
    }
}

struct FieldFailure {
    error: ContactError,
    path: Vec<PathSegment>,
}

type ResolveFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, FieldFailure>> + Send + 'a>>;

/// Runs requests against a contact engine.
pub struct QueryExecutor {
    engine: Arc<ContactEngine>,
    max_depth: usize,
}

impl QueryExecutor {
    /// Build an executor. `max_depth` bounds nested `friends` selections.
    pub fn new(engine: Arc<ContactEngine>, max_depth: usize) -> Self {
        Self { engine, max_depth }
    }

    /// The configured nesting limit.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Validate and execute one request.
    pub async fn execute(&self, request: QueryRequest) -> QueryResponse {
        let QueryRequest {
            operation,
            arguments,
            selection,
        } = request;
        let root = vec![PathSegment::Key(operation.clone())];

        let op = match Operation::parse(&operation, arguments) {
            Ok(op) => op,
            Err(e) => return QueryResponse::failed(&e, root),
        };
        let shape = op.return_shape();
        let selection = match self.check_selection(shape, &selection) {
            Ok(selection) => selection,
            Err(e) => return QueryResponse::failed(&e, root),
        };

        debug!(operation = op.name(), "executing operation");
        match self.run(op, &selection, root.clone()).await {
            Ok(value) => {
                let mut data = Map::new();
                data.insert(operation, value);
                QueryResponse {
                    data: Some(Value::Object(data)),
                    errors: Vec::new(),
                }
            }
            Err(failure) => {
                warn!(operation = %operation, error = %failure.error, "operation failed");
                let error = QueryError::new(&failure.error, failure.path);
                let data = shape.is_nullable().then(|| {
                    let mut data = Map::new();
                    data.insert(operation, Value::Null);
                    Value::Object(data)
                });
                QueryResponse {
                    data,
                    errors: vec![error],
                }
            }
        }
    }

    fn check_selection(
        &self,
        shape: ReturnShape,
        selection: &[SelectionItem],
    ) -> Result<Vec<SelectedField>, ContactError> {
        if shape.is_contact() {
            validate_selection(selection, self.max_depth)
        } else if selection.is_empty() {
            Ok(Vec::new())
        } else {
            Err(ContactError::Validation(
                "Boolean result takes no selection".to_owned(),
            ))
        }
    }

    async fn run(
        &self,
        op: Operation,
        selection: &[SelectedField],
        path: Vec<PathSegment>,
    ) -> Result<Value, FieldFailure> {
        let at_root = |error: ContactError| FieldFailure {
            error,
            path: path.clone(),
        };
        match op {
            Operation::GetContact { id } => {
                match self.engine.get_contact(&id).await.map_err(at_root)? {
                    Some(contact) => self.resolve_contact(contact, selection, path.clone()).await,
                    None => Ok(Value::Null),
                }
            }
            Operation::GetContacts => {
                let contacts = self.engine.get_contacts().await.map_err(at_root)?;
                self.resolve_list(contacts, selection, path.clone()).await
            }
            Operation::AddContact(input) => {
                let contact = self.engine.add_contact(input).await.map_err(at_root)?;
                self.resolve_contact(contact, selection, path.clone()).await
            }
            Operation::UpdateContact(input) => {
                let contact = self.engine.update_contact(input).await.map_err(at_root)?;
                self.resolve_contact(contact, selection, path.clone()).await
            }
            Operation::DeleteContact { id } => {
                let deleted = self.engine.delete_contact(&id).await.map_err(at_root)?;
                Ok(Value::Bool(deleted))
            }
        }
    }

    async fn resolve_list(
        &self,
        contacts: Vec<Contact>,
        selection: &[SelectedField],
        path: Vec<PathSegment>,
    ) -> Result<Value, FieldFailure> {
        let mut items = Vec::with_capacity(contacts.len());
        for (index, contact) in contacts.into_iter().enumerate() {
            let mut item_path = path.clone();
            item_path.push(PathSegment::Index(index));
            items.push(self.resolve_contact(contact, selection, item_path).await?);
        }
        Ok(Value::Array(items))
    }

    fn resolve_contact<'a>(
        &'a self,
        contact: Contact,
        selection: &'a [SelectedField],
        path: Vec<PathSegment>,
    ) -> ResolveFuture<'a> {
        Box::pin(async move {
            let mut object = Map::new();
            for selected in selection {
                let mut field_path = path.clone();
                field_path.push(PathSegment::Key(selected.field.name().to_owned()));
                let value = match selected.field {
                    ContactField::Id => Value::String(ContactEngine::resolve_id(&contact)),
                    ContactField::Name => Value::String(contact.name.clone()),
                    ContactField::Phone => Value::String(contact.phone.clone()),
                    ContactField::Country => Value::String(contact.country.clone()),
                    ContactField::Time => match self.engine.resolve_time(&contact).await {
                        Ok(time) => Value::String(time),
                        Err(error) => {
                            return Err(FieldFailure {
                                error,
                                path: field_path,
                            })
                        }
                    },
                    ContactField::Friends => {
                        let friends = match self.engine.resolve_friends(&contact).await {
                            Ok(friends) => friends,
                            Err(error) => {
                                return Err(FieldFailure {
                                    error,
                                    path: field_path,
                                })
                            }
                        };
                        self.resolve_list(friends, &selected.selection, field_path)
                            .await?
                    }
                };
                object.insert(selected.field.name().to_owned(), value);
            }
            Ok(Value::Object(object))
        })
    }
}
