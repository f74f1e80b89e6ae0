//! Body codec - the flat `key@=value/` text form.
//!
//! Every entry is rendered as `<key>@=<value>/` and entries are concatenated
//! with nothing in between; the trailing `/` of each entry is the delimiter.
//!
//! The protocol defines no escaping. A value containing `/` or `@=` is sent
//! as-is and will not decode back to the same field-set. This is a property
//! of the upstream format.
//!
//! # Example
//!
//! ```
//! use danmu_client::codec::{BodyCodec, Fields};
//!
//! let mut fields = Fields::new();
//! fields.insert("type", "loginreq");
//! fields.insert("roomid", 288016u32);
//!
//! let text = BodyCodec::serialize(&fields);
//! assert_eq!(text, "type@=loginreq/roomid@=288016/");
//!
//! let decoded = BodyCodec::deserialize(text.as_bytes()).unwrap();
//! assert_eq!(decoded, fields);
//! ```

use super::fields::{FieldValue, Fields};
use crate::error::{DanmuError, Result};

/// Separator between a key and its value.
pub const KEY_VALUE_SEPARATOR: &str = "@=";

/// Terminates every entry.
pub const ENTRY_SEPARATOR: char = '/';

/// Codec for the delimiter-separated body text.
pub struct BodyCodec;

impl BodyCodec {
    /// Serialize fields to body text, in insertion order.
    pub fn serialize(fields: &Fields) -> String {
        let mut out = String::new();
        for (key, value) in fields.iter() {
            out.push_str(key);
            out.push_str(KEY_VALUE_SEPARATOR);
            match value {
                FieldValue::Text(s) => out.push_str(s),
                FieldValue::Int(n) => out.push_str(&n.to_string()),
            }
            out.push(ENTRY_SEPARATOR);
        }
        out
    }

    /// Deserialize body bytes (terminator already removed) into fields.
    ///
    /// Invalid UTF-8 sequences are replaced with U+FFFD. Leading and
    /// trailing `/` runs are stripped and empty segments skipped. When a key
    /// repeats, the last value wins.
    ///
    /// # Errors
    ///
    /// Returns `MalformedBody` if a segment has no `@=` separator.
    pub fn deserialize(body: &[u8]) -> Result<Fields> {
        Self::deserialize_str(&String::from_utf8_lossy(body))
    }

    /// Deserialize body text into fields.
    pub fn deserialize_str(text: &str) -> Result<Fields> {
        let mut fields = Fields::new();

        for segment in text.trim_matches(ENTRY_SEPARATOR).split(ENTRY_SEPARATOR) {
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment.split_once(KEY_VALUE_SEPARATOR).ok_or_else(|| {
                DanmuError::MalformedBody(format!("segment {:?} has no `@=` separator", segment))
            })?;
            fields.insert(key, value);
        }

        Ok(fields)
    }
}
