//! Integration tests for the form pipeline — exercised through the public API
//! only: schema construction, accumulators and the `FormHelper` facade.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use faram_core::{
    accumulate_differential_errors, accumulate_errors, analyze_errors, compile_schema, rules,
    ErrorNode, FieldPath, FormHelper, KeySelector, ObjectSchema, PushMode, Rule, Schema,
    Submission,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn path(p: &str) -> FieldPath {
    FieldPath::parse(p)
}

fn to_json(errors: Option<ErrorNode>) -> Value {
    serde_json::to_value(errors).unwrap()
}

// ── Cross-field validation ──────────────────────────────────────────────────

fn profile_schema() -> Schema {
    ObjectSchema::new([
        ("id", Schema::leaf([rules::required(), rules::integer()])),
        ("name", Schema::leaf([rules::required()])),
        ("description", Schema::leaf([])),
    ])
    .validation(|v| {
        let name = v.get("name").and_then(Value::as_str);
        let description = v.get("description").and_then(Value::as_str);
        match (name, description) {
            (Some(name), Some(description)) if name.len() > description.len() => {
                vec!["Name must be shorter than the description".to_string()]
            }
            _ => Vec::new(),
        }
    })
    .into()
}

#[test]
fn test_name_description_scenario() {
    let mut form = FormHelper::new(profile_schema());
    form.set_value(json!({ "id": 12 }));

    match form.submit() {
        Submission::Failure { field_errors, .. } => {
            assert_eq!(to_json(field_errors), json!({ "name": "Field must not be empty" }));
        }
        other => panic!("expected failure, got {other:?}"),
    }

    form.handle_change(&path("name"), json!("hari prasad adhikari"))
        .unwrap();
    form.handle_change(&path("description"), json!("description"))
        .unwrap();
    assert_eq!(form.get_field_error("name"), None);

    assert!(matches!(form.submit(), Submission::Failure { .. }));
    assert_eq!(
        to_json(form.state().field_errors.clone()),
        json!({ "$internal": ["Name must be shorter than the description"] })
    );
    let root_errors = form.get_form_error("").expect("root form error");
    assert!(root_errors.contains(&"Name must be shorter than the description".to_string()));

    form.handle_change(
        &path("description"),
        json!("I am very very long description"),
    )
    .unwrap();
    assert_eq!(form.get_form_error(""), None);
    assert_eq!(form.state().field_errors, None);
    assert!(!analyze_errors(form.state().field_errors.as_ref()));

    assert_eq!(
        form.submit(),
        Submission::Success(json!({
            "id": 12,
            "name": "hari prasad adhikari",
            "description": "I am very very long description"
        }))
    );
    assert_eq!(form.get_form_error(""), None);
}

// ── Keyed array diffing ─────────────────────────────────────────────────────

fn counted(counter: &Arc<AtomicUsize>, rule: Rule) -> Rule {
    let counter = Arc::clone(counter);
    let message = rule.message().to_string();
    Rule::new(message, move |v| {
        counter.fetch_add(1, Ordering::SeqCst);
        rule.check(v)
    })
}

#[test]
fn test_keyed_array_scenario() {
    let counter = Arc::new(AtomicUsize::new(0));
    let schema = Schema::array(
        Schema::object([
            ("key", Schema::leaf([])),
            ("v", Schema::leaf([counted(&counter, rules::required())])),
        ]),
        KeySelector::field("key"),
    );

    // Same value: cached error returned, no rule evaluated.
    let old = json!([{ "key": 1, "v": "a" }]);
    let old_error: Option<ErrorNode> = Some(serde_json::from_value(json!({ "1": "x" })).unwrap());
    let same = accumulate_differential_errors(&old, &old.clone(), old_error.as_ref(), &schema);
    assert_eq!(same, old_error);
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    // Modified element: only key 1 is re-validated.
    let modified = json!([{ "key": 1, "v": "b" }]);
    let result = accumulate_differential_errors(&old, &modified, old_error.as_ref(), &schema);
    assert_eq!(result, None);
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    // Freshly pushed invalid element: no error under the differential pass...
    let pushed = json!([{ "key": 1, "v": "b" }, { "key": 2, "v": "" }]);
    let result = accumulate_differential_errors(&modified, &pushed, None, &schema);
    assert_eq!(result, None);
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    // ...but the full pass reports it.
    let full = accumulate_errors(&pushed, &schema);
    assert_eq!(to_json(full), json!({ "2": { "v": "Field must not be empty" } }));
}

// ── Declarative schemas through the facade ──────────────────────────────────

#[test]
fn test_compiled_schema_form_round_trip() {
    let schema = compile_schema(&json!({
        "fields": {
            "title": ["required", { "rule": "lengthLessThan", "value": 10 }],
            "links": {
                "member": { "fields": { "id": ["required"], "href": ["required", "url"] } },
                "keySelector": "id"
            }
        }
    }))
    .unwrap();

    let mut form = FormHelper::new(schema);
    form.handle_change(&path("title"), json!("Links")).unwrap();
    form.handle_push(&path("links"), PushMode::End).unwrap();
    form.handle_change(&path("links:0"), json!({ "id": "a", "href": "nope" }))
        .unwrap();

    let Submission::Failure { field_errors, .. } = form.submit() else {
        panic!("expected failure");
    };
    assert!(analyze_errors(field_errors.as_ref()));
    assert_eq!(
        form.get_field_error("links:0:href"),
        Some(&ErrorNode::message("Value must be a valid URL"))
    );

    form.handle_change(&path("links:0:href"), json!("https://example.com"))
        .unwrap();
    assert_eq!(form.get_field_error("links:0:href"), None);
    assert_eq!(
        form.submit(),
        Submission::Success(json!({
            "title": "Links",
            "links": [{ "id": "a", "href": "https://example.com" }]
        }))
    );
}

#[test]
fn test_pop_then_submit() {
    let schema = Schema::object([(
        "tags",
        Schema::array(Schema::leaf([rules::required()]), KeySelector::index()),
    )]);
    let mut form = FormHelper::new(schema);
    form.set_value(json!({ "tags": ["a", "", "c"] }));
    assert!(matches!(form.submit(), Submission::Failure { .. }));
    assert!(form.get_field_error("tags:1").is_some());

    let pop = form.pop_callback("tags:1");
    pop(&mut form).unwrap();
    assert_eq!(form.get_value("tags"), Some(&json!(["a", "c"])));
    assert_eq!(form.state().field_errors, None);
    assert_eq!(
        form.submit(),
        Submission::Success(json!({ "tags": ["a", "c"] }))
    );
}

#[test]
fn test_positional_pop_and_push_keep_errors_aligned() {
    let schema = Schema::object([(
        "tags",
        Schema::array(Schema::leaf([rules::required()]), KeySelector::index()),
    )]);
    let mut form = FormHelper::new(schema);
    form.set_value(json!({ "tags": ["", "", "c"] }));
    assert!(matches!(form.submit(), Submission::Failure { .. }));

    form.handle_pop(&path("tags:0")).unwrap();
    assert_eq!(form.get_value("tags"), Some(&json!(["", "c"])));
    assert_eq!(
        form.get_field_error("tags:0"),
        Some(&ErrorNode::message("Field must not be empty"))
    );
    assert_eq!(form.get_field_error("tags:1"), None);

    form.handle_push(&path("tags"), PushMode::Start).unwrap();
    assert_eq!(form.get_value("tags"), Some(&json!([null, "", "c"])));
    assert_eq!(form.get_field_error("tags:0"), None);
    assert_eq!(
        form.get_field_error("tags:1"),
        Some(&ErrorNode::message("Field must not be empty"))
    );
    assert_eq!(form.get_field_error("tags:2"), None);

    // The full pass agrees once the placeholder is filled in.
    form.handle_change(&path("tags:0"), json!("a")).unwrap();
    let Submission::Failure { field_errors, .. } = form.submit() else {
        panic!("expected failure");
    };
    assert_eq!(to_json(field_errors), json!({ "tags": { "1": "Field must not be empty" } }));
}
