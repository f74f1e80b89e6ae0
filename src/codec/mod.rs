//! Codec module - body text serialization and the field-set types.
//!
//! - [`BodyCodec`] - the flat `key@=value/` text form
//! - [`Fields`] / [`FieldValue`] - the decoded field-set
//!
//! # Design
//!
//! The codec is a marker struct with static methods rather than a trait
//! object, matching how frames are built: there is exactly one body format.
//!
//! # Example
//!
//! ```
//! use danmu_client::codec::{BodyCodec, FieldValue};
//!
//! let fields = BodyCodec::deserialize(b"type@=chatmsg/nn@=Alice/txt@=hi/").unwrap();
//! assert_eq!(fields.get("nn"), Some(&FieldValue::from("Alice")));
//! ```

mod body;
mod fields;

pub use body::{BodyCodec, ENTRY_SEPARATOR, KEY_VALUE_SEPARATOR};
pub use fields::{FieldValue, Fields};
