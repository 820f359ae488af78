pub mod constants;
pub mod decode;
pub mod error;
mod index;
mod keycache;
pub mod num;
pub mod options;
pub mod tree;
pub mod walk;

pub use crate::error::{Error, Result};
pub use crate::index::Composites;
pub use crate::num::{double_to_text, text_to_double};
pub use crate::options::ParseOptions;
pub use crate::tree::{Datatype, Document, Item};
pub use crate::walk::Walker;

/// Decodes one JSON text into a [`Document`].
pub fn parse(input: &str) -> Result<Document> {
    decode::parse(input, &ParseOptions::default())
}

pub fn parse_with_options(input: &str, options: &ParseOptions) -> Result<Document> {
    decode::parse(input, options)
}

/// Decodes a raw byte buffer; the input must be valid UTF-8.
pub fn parse_slice(input: &[u8]) -> Result<Document> {
    decode::parse_slice(input, &ParseOptions::default())
}

pub fn parse_slice_with_options(input: &[u8], options: &ParseOptions) -> Result<Document> {
    decode::parse_slice(input, options)
}

/// Decodes, then applies `reviver` once to every item, root first in
/// depth-first document order.
pub fn parse_with_reviver(input: &str, reviver: impl FnMut(&mut Item)) -> Result<Document> {
    decode::parse_with_reviver(input, &ParseOptions::default(), reviver)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    fn test_parse_and_lookup() {
        let doc = parse(r#"{"name": "ada", "tags": [1, 2]}"#).unwrap();
        let root = doc.root();
        let name = doc.get(root, "name").unwrap();
        assert_eq!(doc.item(name).as_str(), Some("ada"));
        let tags = doc.get(root, "tags").unwrap();
        assert_eq!(doc.item(tags).num_children(), 2);
        let second = doc.get(tags, "1").unwrap();
        assert_eq!(doc.item(second).as_f64(), Some(2.0));
    }

    #[rstest::rstest]
    fn test_parse_slice_requires_utf8() {
        assert!(parse_slice(b"{\"k\": true}").is_ok());
        assert!(matches!(
            parse_slice(&[b'"', 0xff, b'"']),
            Err(Error::InvalidUtf8(_))
        ));
    }

    #[rstest::rstest]
    fn test_reviver_runs_over_every_item() {
        let doc = parse_with_reviver(r#"{"a": 1, "b": [2, 3]}"#, |item| {
            if let Some(value) = item.as_f64() {
                item.set_number(value * 10.0);
            }
        })
        .unwrap();
        let root = doc.root();
        let a = doc.get(root, "a").unwrap();
        assert_eq!(doc.item(a).as_f64(), Some(10.0));
        let b = doc.get(root, "b").unwrap();
        let b1 = doc.child_at(b, 1).unwrap();
        assert_eq!(doc.item(b1).as_f64(), Some(30.0));
    }
}
