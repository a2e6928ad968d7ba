//! Integration tests for the Searchable and SearchableEnum derive macros.
//!
//! These tests verify the generated registrations, field constants, and
//! record access.

#![cfg(feature = "derive")]
#![allow(dead_code)] // Some fields are intentionally skipped for testing

use std::collections::BTreeSet;

use searchkit::{
    AttributeKind, FieldType, FilterOperator, OperatorSet, Record, RecordType, SearchEnum,
    SearchScalar, Searchable, SearchableEnum, Slot, Timestamp, TypeKind, Value,
};

// =============================================================================
// Enums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, SearchableEnum)]
enum Priority {
    Low,
    OnHold,
    #[search(rename = "P0")]
    Critical,
}

#[test]
fn test_enum_members() {
    assert_eq!(Priority::ENUM_TYPE.name, "Priority");
    assert_eq!(Priority::ENUM_TYPE.members, ["LOW", "ON_HOLD", "P0"]);
    assert_eq!(Priority::OnHold.ordinal(), 1);
    assert_eq!(Priority::Critical.ordinal(), 2);
}

#[test]
fn test_enum_is_a_scalar() {
    assert_eq!(Priority::FIELD_TYPE.kind(), TypeKind::Enum);
    match Priority::Critical.search_value() {
        Some(Value::Enum(member)) => {
            assert_eq!(member.name(), "P0");
            assert_eq!(member.ordinal, 2);
        }
        other => panic!("unexpected value: {other:?}"),
    }
    assert_eq!(None::<Priority>.search_value(), None);
}

// =============================================================================
// Records
// =============================================================================

#[derive(Searchable)]
struct Owner {
    #[search]
    email: String,
}

#[derive(Searchable)]
struct Task {
    #[search]
    title: String,

    #[search]
    priority: Priority,

    #[search(rename = "due")]
    due_at: Option<Timestamp>,

    #[search(elements)]
    labels: BTreeSet<String>,

    #[search(one, operators(eq, like))]
    owner: Option<Owner>,

    #[search(many)]
    subtasks: Vec<Task>,

    #[search(skip)]
    secret: String,

    notes: String,
}

fn task() -> Task {
    Task {
        title: "Write docs".into(),
        priority: Priority::OnHold,
        due_at: None,
        labels: ["docs", "easy"].into_iter().map(String::from).collect(),
        owner: Some(Owner {
            email: "ann@example.com".into(),
        }),
        subtasks: vec![Task {
            title: "Outline".into(),
            priority: Priority::Low,
            due_at: Some(Timestamp::from_secs(60)),
            labels: BTreeSet::new(),
            owner: None,
            subtasks: Vec::new(),
            secret: String::new(),
            notes: String::new(),
        }],
        secret: "hunter2".into(),
        notes: "n/a".into(),
    }
}

#[test]
fn test_field_constants_generated() {
    assert_eq!(Task::TITLE, "title");
    assert_eq!(Task::PRIORITY, "priority");
    assert_eq!(Task::DUE, "due");
    assert_eq!(Task::LABELS, "labels");
    assert_eq!(Owner::EMAIL, "email");
}

#[test]
fn test_registration() {
    assert_eq!(Task::record_name(), "Task");

    let attributes = Task::search_attributes();
    let names: Vec<&str> = attributes.iter().map(|a| a.name).collect();
    assert_eq!(
        names,
        ["title", "priority", "dueAt", "labels", "owner", "subtasks"]
    );

    assert_eq!(
        attributes[1].kind,
        AttributeKind::Scalar(FieldType::Enum(Priority::ENUM_TYPE))
    );
    assert_eq!(attributes[2].id, Some("due"));
    assert_eq!(attributes[2].kind, AttributeKind::Scalar(FieldType::Instant));
    assert_eq!(attributes[3].kind, AttributeKind::Elements(FieldType::String));
    assert_eq!(
        attributes[4].kind,
        AttributeKind::ToOne(RecordType::of::<Owner>())
    );
    assert_eq!(
        attributes[4].operators,
        Some(OperatorSet::from_slice(&[
            FilterOperator::Equal,
            FilterOperator::Like
        ]))
    );
    assert_eq!(
        attributes[5].kind,
        AttributeKind::ToMany(RecordType::of::<Task>())
    );
}

#[test]
fn test_record_slots() {
    let task = task();

    assert!(matches!(
        task.slot("title"),
        Slot::Value(Some(Value::String(ref s))) if s == "Write docs"
    ));
    assert!(matches!(task.slot("dueAt"), Slot::Value(None)));
    match task.slot("labels") {
        Slot::Values(values) => assert_eq!(values, [Value::from("docs"), Value::from("easy")]),
        other => panic!("unexpected slot: {other:?}"),
    }
    match task.slot("owner") {
        Slot::One(Some(owner)) => assert!(matches!(
            owner.slot("email"),
            Slot::Value(Some(Value::String(_)))
        )),
        other => panic!("unexpected slot: {other:?}"),
    }
    match task.slot("subtasks") {
        Slot::Many(subtasks) => {
            assert_eq!(subtasks.len(), 1);
            assert!(matches!(
                subtasks[0].slot("dueAt"),
                Slot::Value(Some(Value::Instant(Timestamp(60_000))))
            ));
        }
        other => panic!("unexpected slot: {other:?}"),
    }
}

#[test]
fn test_skipped_and_unannotated_fields_are_missing() {
    let task = task();
    assert!(task.slot("secret").is_missing());
    assert!(task.slot("notes").is_missing());
    assert!(task.slot("due").is_missing());
}
