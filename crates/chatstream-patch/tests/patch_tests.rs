use chatstream_core::error::Error;
use chatstream_core::patch::{JsonPath, PatchOp, PathSegment};
use chatstream_patch::{apply, apply_all, apply_in_place};
use serde_json::{json, Value};

fn p(pointer: &str) -> JsonPath {
    JsonPath::parse_pointer(pointer).unwrap()
}

fn add(pointer: &str, value: Value) -> PatchOp {
    PatchOp::Add { path: p(pointer), value }
}

fn replace(pointer: &str, value: Value) -> PatchOp {
    PatchOp::Replace { path: p(pointer), value }
}

fn remove(pointer: &str) -> PatchOp {
    PatchOp::Remove { path: p(pointer) }
}

/// The shape a reasoning service typically streams for one short answer.
fn run_log_ops() -> Vec<PatchOp> {
    vec![
        replace("", json!({"id": "run-42", "streamed_output": [], "final_output": null, "logs": {}})),
        add("/logs/FindDocs", json!({"id": "step-1", "name": "FindDocs", "final_output": null})),
        add("/logs/FindDocs/final_output", json!({"output": [
            {"metadata": {"source": "https://a.example", "title": "A"}},
            {"metadata": {"source": "https://b.example", "title": "B"}}
        ]})),
        add("/streamed_output/-", json!("Paris ")),
        add("/streamed_output/-", json!("is the capital.[^1]")),
        replace("/final_output", json!({"output": "Paris is the capital.[^1]"})),
    ]
}

#[test]
fn sequential_application_is_a_left_fold() {
    let ops = run_log_ops();
    let all_at_once = apply_all(&json!({}), &ops).expect("apply_all");

    let mut stepwise = json!({});
    for op in &ops {
        stepwise = apply(&stepwise, op).expect("apply");
    }
    assert_eq!(all_at_once, stepwise);

    // Splitting the sequence anywhere gives the same result.
    for cut in 0..=ops.len() {
        let head = apply_all(&json!({}), &ops[..cut]).unwrap();
        let tail = apply_all(&head, &ops[cut..]).unwrap();
        assert_eq!(tail, all_at_once, "cut at {cut}");
    }
    assert_eq!(all_at_once["streamed_output"], json!(["Paris ", "is the capital.[^1]"]));
}

#[test]
fn apply_does_not_touch_its_input() {
    let doc = json!({"a": [1, 2]});
    let next = apply(&doc, &add("/a/0", json!(0))).unwrap();
    assert_eq!(doc, json!({"a": [1, 2]}));
    assert_eq!(next, json!({"a": [0, 1, 2]}));
}

#[test]
fn add_into_array_shifts_and_key_overwrites() {
    let doc = json!({"items": ["a", "c"], "k": 1});
    let doc = apply(&doc, &add("/items/1", json!("b"))).unwrap();
    let doc = apply(&doc, &add("/items/3", json!("d"))).unwrap();
    let doc = apply(&doc, &add("/k", json!(2))).unwrap();
    assert_eq!(doc, json!({"items": ["a", "b", "c", "d"], "k": 2}));

    let err = apply(&doc, &add("/items/9", json!("z"))).unwrap_err();
    assert!(matches!(err, Error::MalformedPatch { .. }));
}

#[test]
fn add_creates_missing_intermediates_by_segment_kind() {
    let doc = apply(&json!({}), &add("/logs/FindDocs/streamed_output/-", json!("x"))).unwrap();
    assert_eq!(doc, json!({"logs": {"FindDocs": {"streamed_output": ["x"]}}}));

    let doc = apply(&json!({}), &add("/rows/0/name", json!("n"))).unwrap();
    assert_eq!(doc, json!({"rows": [{"name": "n"}]}));

    // null intermediates are replaced by containers too
    let doc = apply(&json!({"final_output": null}), &add("/final_output/output", json!(1))).unwrap();
    assert_eq!(doc, json!({"final_output": {"output": 1}}));

    let doc = apply(&Value::Null, &add("/a", json!(true))).unwrap();
    assert_eq!(doc, json!({"a": true}));
}

#[test]
fn numeric_segment_on_object_is_a_key() {
    let doc = apply(&json!({"m": {}}), &add("/m/7", json!("seven"))).unwrap();
    assert_eq!(doc, json!({"m": {"7": "seven"}}));
    let doc = apply(&doc, &replace("/m/7", json!("SEVEN"))).unwrap();
    assert_eq!(doc["m"]["7"], "SEVEN");
}

#[test]
fn array_form_paths_behave_like_pointers() {
    let path = JsonPath::from(vec![PathSegment::Key("xs".into()), PathSegment::Key("0".into())]);
    let doc = apply(&json!({"xs": [1, 2]}), &PatchOp::Replace { path, value: json!(9) }).unwrap();
    assert_eq!(doc, json!({"xs": [9, 2]}));
}

#[test]
fn replace_requires_existing_target() {
    let doc = json!({"a": {"b": 1}});
    assert_eq!(apply(&doc, &replace("/a/b", json!(2))).unwrap(), json!({"a": {"b": 2}}));
    assert_eq!(apply(&doc, &replace("", json!([]))).unwrap(), json!([]));

    for op in [replace("/a/c", json!(2)), replace("/x/y", json!(2)), replace("/a/b/c", json!(0))] {
        match apply(&doc, &op) {
            Err(Error::MalformedPatch { op, .. }) => assert_eq!(op, "replace"),
            other => panic!("expected malformed patch, got {other:?}"),
        }
    }
}

#[test]
fn remove_shifts_arrays_and_rejects_missing() {
    let doc = json!({"xs": [1, 2, 3], "k": true});
    let doc = apply(&doc, &remove("/xs/0")).unwrap();
    let doc = apply(&doc, &remove("/k")).unwrap();
    assert_eq!(doc, json!({"xs": [2, 3]}));

    assert!(apply(&doc, &remove("/xs/5")).is_err());
    assert!(apply(&doc, &remove("/k")).is_err());
    assert!(apply(&doc, &remove("/xs/-")).is_err());
    assert!(apply(&doc, &remove("")).is_err());
}

#[test]
fn failed_ops_leave_document_unchanged() {
    let original = json!({"s": "text", "xs": [], "n": null});
    let failing = [
        add("/s/inner", json!(1)),
        add("/missing/3", json!(1)),
        add("/n/2", json!(1)),
        add("/xs/key", json!(1)),
        replace("/nope", json!(1)),
        remove("/xs/0"),
    ];
    for op in &failing {
        let mut doc = original.clone();
        assert!(apply_in_place(&mut doc, op).is_err(), "{op:?} should fail");
        assert_eq!(doc, original, "{op:?} must not leave partial state");
    }
}

#[test]
fn malformed_error_names_op_and_path() {
    let err = apply(&json!({}), &replace("/a~1b/0", json!(1))).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("replace"), "{msg}");
    assert!(msg.contains("/a~1b/0"), "{msg}");
    assert!(err.is_recoverable());
}

#[test]
fn array_positions_use_strict_index_form() {
    let doc = json!({"xs": [1, 2, 3]});
    for key in ["01", "+1", " 1"] {
        let path = JsonPath::from(vec![PathSegment::Key("xs".into()), PathSegment::Key(key.into())]);
        let mut d = doc.clone();
        assert!(apply_in_place(&mut d, &PatchOp::Replace { path: path.clone(), value: json!(0) }).is_err(), "{key}");
        assert!(apply_in_place(&mut d, &PatchOp::Add { path: path.clone(), value: json!(0) }).is_err(), "{key}");
        assert!(apply_in_place(&mut d, &PatchOp::Remove { path }).is_err(), "{key}");
        assert_eq!(d, doc);
    }
    assert!(apply(&doc, &replace("/xs/01", json!(0))).is_err());
    assert_eq!(apply(&doc, &replace("/xs/1", json!(0))).unwrap(), json!({"xs": [1, 0, 3]}));
}
