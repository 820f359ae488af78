mod parser;

use crate::options::ParseOptions;
use crate::tree::{Document, Item};
use crate::Result;

/// Decodes one JSON text into a document.
pub fn parse(input: &str, options: &ParseOptions) -> Result<Document> {
    let mut doc = Document::new();
    doc.set_walk_depth(options.walk_depth);
    parser::Parser::new(input, options).run(&mut doc)?;
    Ok(doc)
}

/// Decodes a raw byte buffer; the input must be valid UTF-8.
pub fn parse_slice(input: &[u8], options: &ParseOptions) -> Result<Document> {
    let text = std::str::from_utf8(input)?;
    parse(text, options)
}

/// Decodes, then applies `reviver` once to every item in document order
/// (root first, depth-first).
pub fn parse_with_reviver(
    input: &str,
    options: &ParseOptions,
    reviver: impl FnMut(&mut Item),
) -> Result<Document> {
    let mut doc = parse(input, options)?;
    doc.revise(reviver);
    Ok(doc)
}
