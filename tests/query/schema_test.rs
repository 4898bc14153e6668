//! Operation parsing and selection validation.

use agenda::engine::{ContactError, UpdateContact};
use agenda::schema::{
    validate_selection, ContactField, Operation, ReturnShape, SelectionItem,
};
use serde_json::{json, Map, Value};

fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn selection(value: Value) -> Vec<SelectionItem> {
    serde_json::from_value(value).expect("selection should deserialize")
}

#[test]
fn operations_report_return_shape() {
    let get = Operation::parse("getContact", args(json!({"id": "x"}))).expect("parse");
    assert_eq!(get.return_shape(), ReturnShape::OptionalContact);
    assert!(get.return_shape().is_nullable());

    let list = Operation::parse("getContacts", Map::new()).expect("parse");
    assert_eq!(list.return_shape(), ReturnShape::ContactList);
    assert!(!list.return_shape().is_nullable());

    let delete = Operation::parse("deleteContact", args(json!({"id": "x"}))).expect("parse");
    assert!(!delete.return_shape().is_contact());
    assert_eq!(delete.name(), "deleteContact");
}

#[test]
fn update_arguments_keep_absence() {
    let op = Operation::parse(
        "updateContact",
        args(json!({"id": "x", "friends": []})),
    )
    .expect("parse");
    assert_eq!(
        op,
        Operation::UpdateContact(UpdateContact {
            id: "x".to_owned(),
            name: None,
            phone: None,
            friends: Some(Vec::new()),
        })
    );
}

#[test]
fn wrong_argument_type_is_rejected() {
    let err = Operation::parse("getContact", args(json!({"id": 42}))).expect_err("should fail");
    assert!(matches!(err, ContactError::Validation(_)));
}

#[test]
fn nested_selection_is_validated() {
    let fields = validate_selection(
        &selection(json!(["id", {"friends": ["name", {"friends": ["id"]}]}])),
        6,
    )
    .expect("valid");
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[1].field, ContactField::Friends);
    assert_eq!(fields[1].selection[1].selection[0].field, ContactField::Id);
}

#[test]
fn depth_limit_counts_friends_levels() {
    let two_levels = selection(json!([{"friends": [{"friends": ["id"]}]}]));
    assert!(validate_selection(&two_levels, 2).is_ok());
    assert!(validate_selection(&two_levels, 1).is_err());
    assert!(validate_selection(&selection(json!(["id"])), 0).is_ok());
}

#[test]
fn repeated_fields_are_merged() {
    let fields = validate_selection(
        &selection(json!([
            "id",
            {"friends": ["id"]},
            "id",
            {"friends": ["name", "id", {"friends": ["time"]}]}
        ])),
        6,
    )
    .expect("valid");
    let top: Vec<ContactField> = fields.iter().map(|f| f.field).collect();
    assert_eq!(top, vec![ContactField::Id, ContactField::Friends]);

    let nested: Vec<ContactField> = fields[1].selection.iter().map(|f| f.field).collect();
    assert_eq!(
        nested,
        vec![ContactField::Id, ContactField::Name, ContactField::Friends]
    );
}

#[test]
fn merged_selection_still_respects_depth() {
    let items = selection(json!([
        {"friends": ["id"]},
        {"friends": [{"friends": ["id"]}]}
    ]));
    assert!(validate_selection(&items, 1).is_err());
    assert!(validate_selection(&items, 2).is_ok());
}

#[test]
fn empty_nested_selection_is_rejected_even_when_repeated() {
    let items = selection(json!([{"friends": []}, {"friends": ["id"]}]));
    assert!(validate_selection(&items, 6).is_err());
}
