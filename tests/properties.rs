//! Property tests for the body and frame codecs.
//!
//! Bodies have no escaping, so generated keys and values never contain `/`
//! or `@=`. They do contain lone `@` and `=` so that keys ending in `@` and
//! values starting with `=` are exercised.

use danmu_client::codec::{BodyCodec, FieldValue, Fields};
use danmu_client::protocol::{encode_frame, extract_body, Header, HEADER_SIZE, KIND_TO_SERVER};
use proptest::prelude::*;

fn text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_ .@=é中-]{0,12}"
}

fn key_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => text(),
        1 => text().prop_map(|k| format!("{}@", k)),
    ]
    .prop_filter("no separator inside a key", |k| !k.contains("@="))
}

fn value_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => text(),
        1 => text().prop_map(|v| format!("={}", v)),
    ]
    .prop_filter("no separator inside a value", |v| !v.contains("@="))
}

fn fields_strategy() -> impl Strategy<Value = Fields> {
    prop::collection::vec((key_strategy(), value_strategy()), 0..8).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(k, v)| (k, FieldValue::from(v)))
            .collect()
    })
}

proptest! {
    /// Any field-set free of `/` and `@=` survives serialize then deserialize.
    #[test]
    fn prop_body_round_trip(fields in fields_strategy()) {
        let text = BodyCodec::serialize(&fields);
        let decoded = BodyCodec::deserialize(text.as_bytes()).unwrap();
        prop_assert_eq!(decoded, fields);
    }

    /// Every encoded frame declares `9 + body length` in both length fields.
    #[test]
    fn prop_frame_length_invariant(body in prop::collection::vec(any::<u8>(), 0..2048)) {
        let bytes = encode_frame(KIND_TO_SERVER, 0, 0, &body).unwrap();
        let header = Header::decode(&bytes).unwrap();

        prop_assert_eq!(header.length as usize, 9 + body.len());
        prop_assert_eq!(header.length_dup, header.length);
        prop_assert_eq!(bytes.len(), HEADER_SIZE + body.len() + 1);
        prop_assert_eq!(header.content_length(), body.len() + 1);
        prop_assert_eq!(extract_body(&bytes[HEADER_SIZE..]), &body[..]);
    }
}
