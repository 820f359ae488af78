use rstest::rstest;

use jsondom::{parse, parse_with_options, Datatype, Error, ParseOptions};

#[rstest]
fn test_object_index_completeness() {
    let doc = parse(r#"{"a": 1, "b": 2}"#).unwrap();
    let root = doc.root();
    assert_eq!(doc.item(root).datatype(), Datatype::Object);

    let a = doc.get(root, "a").unwrap();
    let b = doc.get(root, "b").unwrap();
    assert_eq!(doc.item(a).as_f64(), Some(1.0));
    assert_eq!(doc.item(b).as_f64(), Some(2.0));
    assert_eq!(doc.get(root, "c"), None);
}

#[rstest]
fn test_array_key_synthesis() {
    let doc = parse("[10, 20, 30]").unwrap();
    let root = doc.root();
    assert_eq!(doc.item(root).datatype(), Datatype::Array);

    let keys: Vec<&str> = doc
        .item(root)
        .children()
        .iter()
        .map(|&child| doc.key_of(child).unwrap())
        .collect();
    assert_eq!(keys, ["0", "1", "2"]);

    // same lookup path as objects
    let second = doc.get(root, "1").unwrap();
    assert_eq!(doc.item(second).as_f64(), Some(20.0));
}

#[rstest]
fn test_insertion_order_is_authoritative() {
    let doc = parse(r#"{"z": 0, "a": 1, "m": 2}"#).unwrap();
    let keys: Vec<&str> = doc
        .item(doc.root())
        .children()
        .iter()
        .map(|&child| doc.key_of(child).unwrap())
        .collect();
    assert_eq!(keys, ["z", "a", "m"]);
}

#[rstest]
fn test_escape_handling() {
    let doc = parse(r#"{"s": "a\"b"}"#).unwrap();
    let s = doc.get(doc.root(), "s").unwrap();
    assert_eq!(doc.item(s).as_str(), Some("a\"b"));
}

#[rstest]
fn test_unicode_escapes() {
    let doc = parse(r#"["\u00e9", "\ud83d\ude00", "a\/b"]"#).unwrap();
    let root = doc.root();
    let texts: Vec<&str> = doc
        .item(root)
        .children()
        .iter()
        .map(|&child| doc.item(child).as_str().unwrap())
        .collect();
    assert_eq!(texts, ["é", "😀", "a/b"]);
}

#[rstest]
fn test_nested_structures() {
    let doc = parse(r#"{"meta": {"ids": [1, 2, 3]}, "ok": true, "none": null}"#).unwrap();
    let root = doc.root();
    let meta = doc.get(root, "meta").unwrap();
    let ids = doc.get(meta, "ids").unwrap();
    assert_eq!(doc.item(ids).num_children(), 3);
    assert_eq!(doc.parent_of(ids), Some(meta));
    assert_eq!(doc.parent_of(meta), Some(root));

    let ok = doc.get(root, "ok").unwrap();
    assert_eq!(doc.item(ok).as_bool(), Some(true));
    assert!(doc.item(doc.get(root, "none").unwrap()).is_null());
}

#[rstest]
fn test_number_grammar() {
    let doc = parse("[0, -1, 2.5, 1e3, -1.25E-2]").unwrap();
    let values: Vec<f64> = doc
        .item(doc.root())
        .children()
        .iter()
        .map(|&child| doc.item(child).as_f64().unwrap())
        .collect();
    assert_eq!(values, [0.0, -1.0, 2.5, 1000.0, -0.0125]);

    assert_eq!(parse("[1.]").unwrap_err(), Error::MalformedNumber { offset: 3 });
    assert_eq!(parse("[-]").unwrap_err(), Error::MalformedNumber { offset: 2 });
    assert_eq!(parse("[1e+]").unwrap_err(), Error::MalformedNumber { offset: 4 });
}

#[rstest]
fn test_malformed_token_carries_offset() {
    let err = parse(r#"{"a": qux}"#).unwrap_err();
    assert_eq!(
        err,
        Error::MalformedToken {
            byte: b'q',
            offset: 6
        }
    );
    assert_eq!(err.offset(), Some(6));
}

#[rstest]
fn test_errors_abort_whole_parse() {
    // tree built so far is discarded; no partial-document success
    for input in [r#"{"a": 1, "b": bad}"#, "[1, 2, }", r#"{"k" 1}"#] {
        assert!(parse(input).is_err(), "{input:?}");
    }
}

#[rstest]
fn test_aborted_parse_teardown_is_safe() {
    // mid-object abort: children already attached, index never built;
    // the failed parse drops its partial tree without issue
    for _ in 0..64 {
        let err = parse(r#"{"a": {"deep": [1, 2, {"x": "#).unwrap_err();
        assert!(matches!(err, Error::UnexpectedEnd { .. }));
    }
}

#[rstest]
fn test_key_length_option() {
    let options = ParseOptions::new().with_max_key_length(4);
    let doc = parse_with_options(r#"{"abcdefgh": 1}"#, &options).unwrap();
    let child = doc.child_at(doc.root(), 0).unwrap();
    assert_eq!(doc.key_of(child), Some("abcd"));
    assert_eq!(doc.get(doc.root(), "abcd"), Some(child));
    assert_eq!(doc.get(doc.root(), "abcdefgh"), None);
}

#[rstest]
fn test_duplicate_keys_last_wins_in_index() {
    let doc = parse(r#"{"k": 1, "k": 2}"#).unwrap();
    let root = doc.root();
    // both children kept in order; the index resolves to the later one
    assert_eq!(doc.item(root).num_children(), 2);
    let hit = doc.get(root, "k").unwrap();
    assert_eq!(doc.item(hit).as_f64(), Some(2.0));
    assert_eq!(doc.num_keys(), 1);
}

#[rstest]
fn test_whitespace_and_control_filler() {
    let doc = parse("\n\t {\r\"a\"\n:\t1 ,\n\"b\" : 2 }\n").unwrap();
    assert_eq!(doc.item(doc.root()).num_children(), 2);
}
