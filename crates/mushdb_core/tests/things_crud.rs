use mushdb_core::{
    Access, Actor, Attributes, CredentialCost, Identity, MushDb, RepoError, StoreOptions,
};
use serde_json::{json, Value};

fn open_store() -> MushDb {
    MushDb::open_in_memory_with(&StoreOptions {
        credential_cost: CredentialCost {
            memory_kib: 256,
            iterations: 1,
            parallelism: 1,
        },
        ..StoreOptions::default()
    })
    .unwrap()
}

fn attrs(value: Value) -> Attributes {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn user(db: &mut MushDb, name: &str) -> Identity {
    db.identity().create_user(name, "pw").unwrap()
}

fn count(db: &MushDb, sql: &str, thing_ref: i64) -> i64 {
    db.connection()
        .query_row(sql, [thing_ref], |row| row.get(0))
        .unwrap()
}

#[test]
fn create_and_get_roundtrip() {
    let mut db = open_store();
    let alice = user(&mut db, "alice");

    let thing_ref = db
        .entities()
        .create_thing(&alice.actor(), &attrs(json!({ "name": "Sword" })), false)
        .unwrap()
        .unwrap();

    let thing = db
        .entities()
        .get_thing(thing_ref, &alice.actor())
        .unwrap()
        .unwrap();
    assert_eq!(thing.thing_ref, thing_ref);
    assert_eq!(thing.attributes, attrs(json!({ "name": "Sword" })));
}

#[test]
fn public_things_are_guest_readable_and_private_ones_are_not() {
    let mut db = open_store();
    let alice = user(&mut db, "alice");
    let public_ref = db
        .entities()
        .create_thing(&alice.actor(), &attrs(json!({ "name": "Sign" })), false)
        .unwrap()
        .unwrap();
    let private_ref = db
        .entities()
        .create_thing(&alice.actor(), &attrs(json!({ "name": "Diary" })), true)
        .unwrap()
        .unwrap();

    assert!(db.entities().get_thing(public_ref, &Actor::Guest).unwrap().is_some());
    assert!(db.entities().get_thing(private_ref, &Actor::Guest).unwrap().is_none());
    assert!(db
        .entities()
        .get_thing(private_ref, &alice.actor())
        .unwrap()
        .is_some());
}

#[test]
fn guests_cannot_create_things() {
    let mut db = open_store();
    let created = db
        .entities()
        .create_thing(&Actor::Guest, &attrs(json!({ "name": "Spam" })), false)
        .unwrap();
    assert!(created.is_none());

    let things: i64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM things;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(things, 0);
}

#[test]
fn patch_merges_and_null_deletes() {
    let mut db = open_store();
    let alice = user(&mut db, "alice");
    let thing_ref = db
        .entities()
        .create_thing(&alice.actor(), &attrs(json!({ "a": 1, "b": 2 })), false)
        .unwrap()
        .unwrap();

    db.entities()
        .patch_thing(thing_ref, &alice.actor(), &attrs(json!({ "b": null, "c": 3 })))
        .unwrap()
        .unwrap();

    let thing = db
        .entities()
        .get_thing(thing_ref, &alice.actor())
        .unwrap()
        .unwrap();
    assert_eq!(thing.attributes, attrs(json!({ "a": 1, "c": 3 })));
}

#[test]
fn patch_by_non_writer_is_denied_and_leaves_attributes() {
    let mut db = open_store();
    let alice = user(&mut db, "alice");
    let bob = user(&mut db, "bob");
    let thing_ref = db
        .entities()
        .create_thing(&alice.actor(), &attrs(json!({ "title": "New Moon" })), false)
        .unwrap()
        .unwrap();

    for actor in [bob.actor(), Actor::Guest] {
        let result = db
            .entities()
            .patch_thing(thing_ref, &actor, &attrs(json!({ "title": "Twilight" })))
            .unwrap();
        assert!(result.is_none());
    }

    let thing = db
        .entities()
        .get_thing(thing_ref, &bob.actor())
        .unwrap()
        .unwrap();
    assert_eq!(thing.attributes["title"], json!("New Moon"));
}

#[test]
fn destroy_cascades_to_permission_record() {
    let mut db = open_store();
    let alice = user(&mut db, "alice");
    let thing_ref = db
        .entities()
        .create_thing(&alice.actor(), &attrs(json!({ "name": "Torch" })), false)
        .unwrap()
        .unwrap();

    db.entities()
        .destroy_thing(thing_ref, &alice.actor())
        .unwrap()
        .unwrap();

    assert!(db
        .entities()
        .get_thing(thing_ref, &alice.actor())
        .unwrap()
        .is_none());
    assert_eq!(
        count(&db, "SELECT COUNT(*) FROM permissions WHERE thingref = ?1;", thing_ref),
        0
    );
    assert_eq!(
        count(&db, "SELECT COUNT(*) FROM things WHERE ref = ?1;", thing_ref),
        0
    );
}

#[test]
fn destroy_requires_ownership() {
    let mut db = open_store();
    let alice = user(&mut db, "alice");
    let bob = user(&mut db, "bob");
    let thing_ref = db
        .entities()
        .create_thing(&alice.actor(), &attrs(json!({ "name": "Anvil" })), false)
        .unwrap()
        .unwrap();

    assert!(db
        .entities()
        .destroy_thing(thing_ref, &bob.actor())
        .unwrap()
        .is_none());
    assert!(db
        .entities()
        .get_thing(thing_ref, &bob.actor())
        .unwrap()
        .is_some());
}

#[test]
fn refs_are_not_reused_after_destroy() {
    let mut db = open_store();
    let alice = user(&mut db, "alice");
    let first = db
        .entities()
        .create_thing(&alice.actor(), &Attributes::new(), false)
        .unwrap()
        .unwrap();
    db.entities()
        .destroy_thing(first, &alice.actor())
        .unwrap()
        .unwrap();

    let second = db
        .entities()
        .create_thing(&alice.actor(), &Attributes::new(), false)
        .unwrap()
        .unwrap();
    assert!(second > first);
}

#[test]
fn missing_permission_record_fails_closed() {
    let mut db = open_store();
    let alice = user(&mut db, "alice");
    let thing_ref = db
        .entities()
        .create_thing(&alice.actor(), &attrs(json!({ "name": "Orphan" })), false)
        .unwrap()
        .unwrap();
    db.connection()
        .execute("DELETE FROM permissions WHERE thingref = ?1;", [thing_ref])
        .unwrap();

    for actor in [alice.actor(), Actor::Guest] {
        assert_eq!(db.entities().evaluate(thing_ref, &actor).unwrap(), Access::NONE);
        assert!(db.entities().get_thing(thing_ref, &actor).unwrap().is_none());
    }
    assert!(db
        .entities()
        .destroy_thing(thing_ref, &alice.actor())
        .unwrap()
        .is_none());
}

#[test]
fn unknown_refs_read_as_not_found() {
    let mut db = open_store();
    let alice = user(&mut db, "alice");
    assert!(db.entities().get_thing(4242, &alice.actor()).unwrap().is_none());
    assert!(db
        .entities()
        .patch_thing(4242, &alice.actor(), &attrs(json!({ "x": 1 })))
        .unwrap()
        .is_none());
}

#[test]
fn corrupt_attributes_are_a_hard_error() {
    let mut db = open_store();
    let alice = user(&mut db, "alice");
    let thing_ref = db
        .entities()
        .create_thing(&alice.actor(), &attrs(json!({ "name": "Glitch" })), false)
        .unwrap()
        .unwrap();
    db.connection()
        .execute(
            "UPDATE things SET attributes = '{broken' WHERE ref = ?1;",
            [thing_ref],
        )
        .unwrap();

    let err = db
        .entities()
        .get_thing(thing_ref, &alice.actor())
        .unwrap_err();
    assert!(matches!(err, RepoError::Codec(_)));

    let err = db
        .entities()
        .patch_thing(thing_ref, &alice.actor(), &attrs(json!({ "x": 1 })))
        .unwrap_err();
    assert!(matches!(err, RepoError::Codec(_)));
}
