use pretty_assertions::assert_eq;

use crate::{
    bson::doc,
    concern::WriteConcern,
    error::ErrorKind,
    operation::{test, CreateCollection, Operation},
    options::CreateCollectionOptions,
};

#[test]
fn build() {
    let options = CreateCollectionOptions::builder()
        .capped(true)
        .size(4096)
        .max(100)
        .write_concern(WriteConcern::builder().journal(true).build())
        .build();
    let mut op = CreateCollection::new("test_db", "test_coll", Some(options));

    let cmd = op.build().unwrap();
    assert_eq!(cmd.name(), "create");
    assert_eq!(cmd.target_db(), "test_db");
    assert_eq!(
        cmd.into_document().unwrap(),
        doc! {
            "create": "test_coll",
            "capped": true,
            "size": 4096_i64,
            "max": 100_i64,
            "writeConcern": { "j": true },
        }
    );
}

#[test]
fn build_with_validator() {
    let options = CreateCollectionOptions::builder()
        .validator(doc! { "x": { "$exists": true } })
        .build();
    let mut op = CreateCollection::new("test_db", "test_coll", Some(options));

    assert_eq!(
        op.build().unwrap().into_document().unwrap(),
        doc! {
            "create": "test_coll",
            "validator": { "x": { "$exists": true } },
        }
    );
}

#[test]
fn capped_without_size_is_invalid() {
    let options = CreateCollectionOptions::builder().capped(true).build();
    let mut op = CreateCollection::new("test_db", "test_coll", Some(options));

    let err = op.build().unwrap_err();
    assert!(matches!(*err.kind, ErrorKind::InvalidCommand { .. }));
}

#[test]
fn handle_success() {
    let op = CreateCollection::new("test_db", "test_coll", None);

    assert!(op.handle_response(doc! { "ok": 1.0 }).is_ok());
    assert!(op.handle_response(doc! { "ok": 1.0, "hello": "world" }).is_ok());
}

#[test]
fn handle_command_error() {
    test::handle_command_error(CreateCollection::new("test_db", "test_coll", None));
}

#[test]
fn handle_write_concern_error() {
    test::handle_write_concern_error(CreateCollection::new("test_db", "test_coll", None));
}
