use memchr::memchr2;

use crate::constants::is_skippable;
use crate::num::number::scan_numeral;
use crate::options::ParseOptions;
use crate::tree::{Datatype, Document, Payload};
use crate::{Error, Result};

/// Single-pass decoder. The tree under construction is also the parse
/// stack: the current item descends into a freshly appended child on an
/// opening delimiter and returns to its parent on the matching close, so
/// nesting depth never touches the native call stack.
pub(crate) struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    max_key_length: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(input: &'a str, options: &ParseOptions) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            max_key_length: options.max_key_length,
        }
    }

    pub(crate) fn run(&mut self, doc: &mut Document) -> Result<()> {
        let root = doc.root();
        let mut current = Some(root);
        // one pending key serves every nesting level: it is always
        // consumed by the ':' that follows it, before any descent
        let mut pending_key: Option<usize> = None;

        while let Some(cur) = current {
            if self.pos >= self.bytes.len() {
                let item = doc.item(cur);
                if cur == root && !item.is_composite() && item.datatype() != Datatype::Undefined {
                    return Ok(());
                }
                return Err(Error::UnexpectedEnd { offset: self.pos });
            }
            let byte = self.bytes[self.pos];
            match doc.item(cur).datatype() {
                Datatype::Object => current = self.step_object(doc, cur, &mut pending_key, byte)?,
                Datatype::Array => current = self.step_array(doc, cur, byte)?,
                Datatype::Undefined => self.step_entity(doc, cur, byte)?,
                _ => {
                    // completed scalar root; only filler may follow
                    if is_skippable(byte) {
                        self.pos += 1;
                    } else {
                        return Err(self.malformed(byte));
                    }
                }
            }
        }

        // root composite closed; only filler may follow
        self.skip_filler();
        if self.pos < self.bytes.len() {
            return Err(self.malformed(self.bytes[self.pos]));
        }
        Ok(())
    }

    /// First significant token of the document sets the root's datatype
    /// in place; the root is the value, not a wrapper.
    fn step_entity(&mut self, doc: &mut Document, root: usize, byte: u8) -> Result<()> {
        match byte {
            b'{' => self.open(doc, root, Datatype::Object),
            b'[' => self.open(doc, root, Datatype::Array),
            b'"' => {
                let value = self.scan_string()?;
                Self::store(doc, root, Datatype::String, Payload::String(value));
            }
            b't' | b'f' => {
                let value = self.scan_boolean(byte)?;
                Self::store(doc, root, Datatype::Boolean, Payload::Boolean(value));
            }
            b'n' => {
                self.expect_literal(b"null")?;
                Self::store(doc, root, Datatype::Null, Payload::None);
            }
            b'-' | b'0'..=b'9' => {
                let value = self.scan_number()?;
                Self::store(doc, root, Datatype::Number, Payload::Number(value));
            }
            _ if is_skippable(byte) => self.pos += 1,
            _ => return Err(self.malformed(byte)),
        }
        Ok(())
    }

    /// One step inside an object: alternates between awaiting a key and,
    /// after the colon, decoding the value in place.
    fn step_object(
        &mut self,
        doc: &mut Document,
        cur: usize,
        pending_key: &mut Option<usize>,
        byte: u8,
    ) -> Result<Option<usize>> {
        match byte {
            b'}' => {
                self.pos += 1;
                doc.finalize_composite(cur);
                Ok(doc.parent_of(cur))
            }
            b'"' => {
                let key = self.scan_string()?;
                let key = truncate_key(key, self.max_key_length);
                *pending_key = Some(doc.intern(&key));
                Ok(Some(cur))
            }
            b':' => {
                if pending_key.is_none() {
                    return Err(self.malformed(byte));
                }
                self.pos += 1;
                self.skip_filler();
                if self.pos >= self.bytes.len() {
                    return Err(Error::UnexpectedEnd { offset: self.pos });
                }
                let slot = pending_key.take();
                self.emit_value(doc, cur, slot)
            }
            b',' => {
                self.pos += 1;
                Ok(Some(cur))
            }
            _ if is_skippable(byte) => {
                self.pos += 1;
                Ok(Some(cur))
            }
            _ => Err(self.malformed(byte)),
        }
    }

    /// One step inside an array: every value position gets the decimal
    /// child count synthesized as its key, through the same interning
    /// path object keys take.
    fn step_array(&mut self, doc: &mut Document, cur: usize, byte: u8) -> Result<Option<usize>> {
        match byte {
            b']' => {
                self.pos += 1;
                doc.finalize_composite(cur);
                Ok(doc.parent_of(cur))
            }
            b',' => {
                self.pos += 1;
                Ok(Some(cur))
            }
            _ if is_skippable(byte) => {
                self.pos += 1;
                Ok(Some(cur))
            }
            _ => {
                let slot = doc.keys.intern_position(doc.item(cur).num_children());
                self.emit_value(doc, cur, Some(slot))
            }
        }
    }

    /// Decodes the value starting at the cursor into a new child of
    /// `parent`. Scalars complete immediately and control stays with the
    /// parent; composites become the new current item.
    fn emit_value(
        &mut self,
        doc: &mut Document,
        parent: usize,
        key: Option<usize>,
    ) -> Result<Option<usize>> {
        let byte = self.bytes[self.pos];
        match byte {
            b'{' => {
                let child = doc.push_child(parent, key);
                self.open(doc, child, Datatype::Object);
                Ok(Some(child))
            }
            b'[' => {
                let child = doc.push_child(parent, key);
                self.open(doc, child, Datatype::Array);
                Ok(Some(child))
            }
            b'"' => {
                let value = self.scan_string()?;
                let child = doc.push_child(parent, key);
                Self::store(doc, child, Datatype::String, Payload::String(value));
                Ok(Some(parent))
            }
            b't' | b'f' => {
                let value = self.scan_boolean(byte)?;
                let child = doc.push_child(parent, key);
                Self::store(doc, child, Datatype::Boolean, Payload::Boolean(value));
                Ok(Some(parent))
            }
            b'n' => {
                self.expect_literal(b"null")?;
                let child = doc.push_child(parent, key);
                Self::store(doc, child, Datatype::Null, Payload::None);
                Ok(Some(parent))
            }
            b'-' | b'0'..=b'9' => {
                let value = self.scan_number()?;
                let child = doc.push_child(parent, key);
                Self::store(doc, child, Datatype::Number, Payload::Number(value));
                Ok(Some(parent))
            }
            _ => Err(self.malformed(byte)),
        }
    }

    fn open(&mut self, doc: &mut Document, id: usize, datatype: Datatype) {
        doc.open_composite(id, datatype);
        self.pos += 1;
    }

    fn store(doc: &mut Document, id: usize, datatype: Datatype, payload: Payload) {
        let item = doc.item_mut(id);
        item.datatype = datatype;
        item.payload = payload;
    }

    fn scan_boolean(&mut self, byte: u8) -> Result<bool> {
        if byte == b't' {
            self.expect_literal(b"true")?;
            Ok(true)
        } else {
            self.expect_literal(b"false")?;
            Ok(false)
        }
    }

    fn expect_literal(&mut self, literal: &'static [u8]) -> Result<()> {
        if self.bytes[self.pos..].starts_with(literal) {
            self.pos += literal.len();
            Ok(())
        } else {
            Err(self.malformed(self.bytes[self.pos]))
        }
    }

    fn scan_number(&mut self) -> Result<f64> {
        let start = self.pos;
        let end = scan_numeral(self.bytes, start)?;
        let value = self.input[start..end]
            .parse::<f64>()
            .map_err(|_| Error::MalformedNumber { offset: start })?;
        self.pos = end;
        Ok(value)
    }

    /// Scans the string whose opening quote the cursor sits on, decoding
    /// escapes, and leaves the cursor one byte past the closing quote.
    fn scan_string(&mut self) -> Result<String> {
        let mut out = String::new();
        let mut from = self.pos + 1;
        loop {
            let Some(found) = memchr2(b'"', b'\\', &self.bytes[from..]) else {
                return Err(Error::UnexpectedEnd {
                    offset: self.bytes.len(),
                });
            };
            let at = from + found;
            out.push_str(&self.input[from..at]);
            if self.bytes[at] == b'"' {
                self.pos = at + 1;
                return Ok(out);
            }
            from = self.decode_escape(at, &mut out)?;
        }
    }

    /// Decodes one escape sequence starting at its backslash; returns the
    /// offset of the first byte after it.
    fn decode_escape(&self, backslash: usize, out: &mut String) -> Result<usize> {
        let Some(&code) = self.bytes.get(backslash + 1) else {
            return Err(Error::UnexpectedEnd {
                offset: self.bytes.len(),
            });
        };
        let decoded = match code {
            b'"' => '"',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{0008}',
            b'f' => '\u{000C}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => return self.decode_unicode_escape(backslash, out),
            _ => {
                return Err(Error::MalformedToken {
                    byte: code,
                    offset: backslash + 1,
                })
            }
        };
        out.push(decoded);
        Ok(backslash + 2)
    }

    fn decode_unicode_escape(&self, backslash: usize, out: &mut String) -> Result<usize> {
        let unit = self.read_hex4(backslash + 2)?;
        if (0xDC00..=0xDFFF).contains(&unit) {
            // low surrogate with no preceding high half
            return Err(Error::MalformedToken {
                byte: b'u',
                offset: backslash + 1,
            });
        }
        if (0xD800..=0xDBFF).contains(&unit) {
            let next = backslash + 6;
            if self.bytes.get(next) != Some(&b'\\') || self.bytes.get(next + 1) != Some(&b'u') {
                return Err(Error::MalformedToken {
                    byte: b'u',
                    offset: backslash + 1,
                });
            }
            let low = self.read_hex4(next + 2)?;
            if !(0xDC00..=0xDFFF).contains(&low) {
                return Err(Error::MalformedToken {
                    byte: b'u',
                    offset: next + 1,
                });
            }
            let scalar = 0x10000 + ((u32::from(unit) - 0xD800) << 10) + (u32::from(low) - 0xDC00);
            let decoded = char::from_u32(scalar).ok_or(Error::MalformedToken {
                byte: b'u',
                offset: backslash + 1,
            })?;
            out.push(decoded);
            return Ok(next + 6);
        }
        let decoded = char::from_u32(u32::from(unit)).ok_or(Error::MalformedToken {
            byte: b'u',
            offset: backslash + 1,
        })?;
        out.push(decoded);
        Ok(backslash + 6)
    }

    fn read_hex4(&self, at: usize) -> Result<u16> {
        if at + 4 > self.bytes.len() {
            return Err(Error::UnexpectedEnd {
                offset: self.bytes.len(),
            });
        }
        let mut unit = 0u16;
        for step in 0..4 {
            let byte = self.bytes[at + step];
            let digit = match byte {
                b'0'..=b'9' => byte - b'0',
                b'a'..=b'f' => byte - b'a' + 10,
                b'A'..=b'F' => byte - b'A' + 10,
                _ => {
                    return Err(Error::MalformedToken {
                        byte,
                        offset: at + step,
                    })
                }
            };
            unit = (unit << 4) | u16::from(digit);
        }
        Ok(unit)
    }

    fn skip_filler(&mut self) {
        while self.pos < self.bytes.len() && is_skippable(self.bytes[self.pos]) {
            self.pos += 1;
        }
    }

    fn malformed(&self, byte: u8) -> Error {
        Error::MalformedToken {
            byte,
            offset: self.pos,
        }
    }
}

fn truncate_key(mut key: String, limit: usize) -> String {
    if key.len() > limit {
        let mut end = limit;
        while !key.is_char_boundary(end) {
            end -= 1;
        }
        key.truncate(end);
    }
    key
}
