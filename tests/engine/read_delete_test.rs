//! `get_contact`, `get_contacts` and `delete_contact`.

use agenda::engine::ContactError;

use crate::support::{harness, new_contact, unknown_id, StubPhoneService};

#[tokio::test]
async fn get_unknown_id_is_none() {
    let h = harness(StubPhoneService::new()).await;
    let found = h
        .engine
        .get_contact(&unknown_id())
        .await
        .expect("lookup should succeed");
    assert!(found.is_none());
}

#[tokio::test]
async fn get_malformed_id_is_validation_error() {
    let h = harness(StubPhoneService::new()).await;
    let err = h
        .engine
        .get_contact("65f1c0ffee")
        .await
        .expect_err("malformed id");
    assert!(matches!(err, ContactError::Validation(_)), "got {err:?}");
}

#[tokio::test]
async fn get_twice_returns_identical_data() {
    let h = harness(StubPhoneService::new()).await;
    let ann = h
        .engine
        .add_contact(new_contact("Ann", "+1"))
        .await
        .expect("add");
    let id = ann.id.to_string();

    let first = h.engine.get_contact(&id).await.expect("first");
    let second = h.engine.get_contact(&id).await.expect("second");
    assert_eq!(first, second);
    assert_eq!(first, Some(ann));
}

#[tokio::test]
async fn get_contacts_lists_in_insertion_order() {
    let h = harness(StubPhoneService::new()).await;
    for (name, phone) in [("Ann", "+1"), ("Bob", "+2"), ("Cat", "+3")] {
        h.engine
            .add_contact(new_contact(name, phone))
            .await
            .expect("add");
    }
    let names: Vec<String> = h
        .engine
        .get_contacts()
        .await
        .expect("list")
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Ann", "Bob", "Cat"]);
}

#[tokio::test]
async fn delete_existing_returns_true_then_false() {
    let h = harness(StubPhoneService::new()).await;
    let ann = h
        .engine
        .add_contact(new_contact("Ann", "+1"))
        .await
        .expect("add");
    let id = ann.id.to_string();

    assert!(h.engine.delete_contact(&id).await.expect("delete"));
    assert!(!h.engine.delete_contact(&id).await.expect("second delete"));
    assert!(h.engine.get_contact(&id).await.expect("get").is_none());
}

#[tokio::test]
async fn delete_unknown_id_is_false_not_error() {
    let h = harness(StubPhoneService::new().without_credential()).await;
    let deleted = h
        .engine
        .delete_contact(&unknown_id())
        .await
        .expect("delete never fails on a miss");
    assert!(!deleted);
}

#[tokio::test]
async fn delete_does_not_cascade_into_friend_lists() {
    let h = harness(StubPhoneService::new()).await;
    let bob = h
        .engine
        .add_contact(new_contact("Bob", "+2"))
        .await
        .expect("add bob");
    let ann = h
        .engine
        .add_contact(agenda::engine::AddContact {
            name: "Ann".to_owned(),
            phone: "+1".to_owned(),
            friends: Some(vec![bob.id.to_string()]),
        })
        .await
        .expect("add ann");

    assert!(h
        .engine
        .delete_contact(&bob.id.to_string())
        .await
        .expect("delete bob"));

    let ann = h
        .engine
        .get_contact(&ann.id.to_string())
        .await
        .expect("get")
        .expect("ann exists");
    assert_eq!(ann.friends, vec![bob.id], "reference is left dangling");
    assert!(h
        .engine
        .resolve_friends(&ann)
        .await
        .expect("resolve")
        .is_empty());
}
