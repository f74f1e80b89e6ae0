//! Messages exchanged with the danmu server.
//!
//! A [`Message`] pairs the envelope metadata (kind, secret, reserved) with a
//! [`Fields`] set. The same type is used for outbound requests and inbound
//! events; the `type` field says which one it is.

use std::fmt;

use serde::Serialize;

use crate::codec::{BodyCodec, FieldValue, Fields};
use crate::error::Result;
use crate::protocol::{encode_frame, Frame, KIND_FROM_SERVER, KIND_TO_SERVER};

/// Name of the field carrying the message type.
pub const TYPE_FIELD: &str = "type";

/// Outbound login request type.
pub const LOGIN_REQUEST: &str = "loginreq";

/// Outbound group join type.
pub const JOIN_GROUP: &str = "joingroup";

/// Heartbeat type, sent by the client and echoed by the server.
pub const KEEPLIVE: &str = "keeplive";

/// Group joined by `joingroup`: all danmu of the room.
pub const ALL_GROUPS_ID: i64 = -9999;

/// A protocol message: envelope metadata plus a field-set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    kind: u16,
    secret: u8,
    reserved: u8,
    fields: Fields,
}

impl Message {
    /// Create an empty message of the given kind.
    pub fn new(kind: u16) -> Self {
        Self {
            kind,
            secret: 0,
            reserved: 0,
            fields: Fields::new(),
        }
    }

    /// Create an empty client → server message.
    pub fn to_server() -> Self {
        Self::new(KIND_TO_SERVER)
    }

    /// Create an empty server → client message.
    pub fn from_server() -> Self {
        Self::new(KIND_FROM_SERVER)
    }

    /// Decode a server → client message from body bytes (terminator removed).
    pub fn from_server_body(body: &[u8]) -> Result<Self> {
        let mut message = Self::from_server();
        message.fields = BodyCodec::deserialize(body)?;
        Ok(message)
    }

    /// Decode a message from a frame, keeping its envelope metadata.
    pub fn decode(frame: &Frame) -> Result<Self> {
        Ok(Self {
            kind: frame.header.kind,
            secret: frame.header.secret,
            reserved: frame.header.reserved,
            fields: BodyCodec::deserialize(frame.body())?,
        })
    }

    /// Build the `loginreq` request for a room.
    pub fn login_request(room_id: u32) -> Self {
        Self::to_server()
            .with_field(TYPE_FIELD, LOGIN_REQUEST)
            .with_field("roomid", room_id)
    }

    /// Build the `joingroup` request for a room.
    pub fn join_group(room_id: u32) -> Self {
        Self::to_server()
            .with_field(TYPE_FIELD, JOIN_GROUP)
            .with_field("rid", room_id)
            .with_field("gid", ALL_GROUPS_ID)
    }

    /// Build a `keeplive` heartbeat carrying a unix timestamp in seconds.
    pub fn keeplive(tick: i64) -> Self {
        Self::to_server()
            .with_field(TYPE_FIELD, KEEPLIVE)
            .with_field("tick", tick)
    }

    /// Set a field, builder style.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name, value);
        self
    }

    /// Set a field.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> &mut Self {
        self.fields.insert(name, value);
        self
    }

    /// Get a field.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Get a text field.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(FieldValue::as_str)
    }

    /// Get a field coerced to an integer.
    pub fn field_i64(&self, name: &str) -> Option<i64> {
        self.field(name).and_then(FieldValue::as_i64)
    }

    /// Get all fields.
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Get the `type` field as a [`MessageType`].
    ///
    /// Returns `None` only when the field is absent.
    pub fn message_type(&self) -> Option<MessageType> {
        self.field(TYPE_FIELD)
            .map(|value| MessageType::from(value.to_string().as_str()))
    }

    /// Get the frame kind.
    #[inline]
    pub fn kind(&self) -> u16 {
        self.kind
    }

    /// Get the secret byte.
    #[inline]
    pub fn secret(&self) -> u8 {
        self.secret
    }

    /// Get the reserved byte.
    #[inline]
    pub fn reserved(&self) -> u8 {
        self.reserved
    }

    /// Serialize the fields to body text.
    pub fn body(&self) -> String {
        BodyCodec::serialize(&self.fields)
    }

    /// Encode the message as a complete frame.
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_frame(self.kind, self.secret, self.reserved, self.body().as_bytes())
    }
}

/// The `type` of a message.
///
/// Parsing never fails: values outside the known set become
/// [`MessageType::Unknown`] so they still reach handlers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// `loginres` - login response.
    LoginResponse,
    /// `keeplive` - heartbeat echo.
    Keeplive,
    /// `chatmsg` - a chat (danmu) message.
    ChatMessage,
    /// `onlinegift` - online reward crit.
    OnlineGift,
    /// `dgb` - a gift was sent.
    Gift,
    /// `uenter` - a notable user entered the room.
    UserEnter,
    /// `bc_buy_deserve` - a user bought a deserve subscription.
    BuyDeserve,
    /// `rss` - room went live or offline.
    LiveStatus,
    /// `ranklist` - rank list broadcast.
    RankList,
    /// `ssd` - super danmu broadcast.
    SuperDanmu,
    /// `spbc` - in-room gift broadcast.
    GiftBroadcast,
    /// `ggbb` - a user grabbed a red packet.
    RedPacket,
    /// `rankup` - room top-10 ranking changed.
    RankUp,
    /// Any other value, kept verbatim.
    Unknown(String),
}

impl MessageType {
    /// The wire value of this type.
    pub fn as_str(&self) -> &str {
        match self {
            MessageType::LoginResponse => "loginres",
            MessageType::Keeplive => KEEPLIVE,
            MessageType::ChatMessage => "chatmsg",
            MessageType::OnlineGift => "onlinegift",
            MessageType::Gift => "dgb",
            MessageType::UserEnter => "uenter",
            MessageType::BuyDeserve => "bc_buy_deserve",
            MessageType::LiveStatus => "rss",
            MessageType::RankList => "ranklist",
            MessageType::SuperDanmu => "ssd",
            MessageType::GiftBroadcast => "spbc",
            MessageType::RedPacket => "ggbb",
            MessageType::RankUp => "rankup",
            MessageType::Unknown(other) => other,
        }
    }

    /// Check if this is a type outside the known set.
    pub fn is_unknown(&self) -> bool {
        matches!(self, MessageType::Unknown(_))
    }
}

impl From<&str> for MessageType {
    fn from(value: &str) -> Self {
        match value {
            "loginres" => MessageType::LoginResponse,
            KEEPLIVE => MessageType::Keeplive,
            "chatmsg" => MessageType::ChatMessage,
            "onlinegift" => MessageType::OnlineGift,
            "dgb" => MessageType::Gift,
            "uenter" => MessageType::UserEnter,
            "bc_buy_deserve" => MessageType::BuyDeserve,
            "rss" => MessageType::LiveStatus,
            "ranklist" => MessageType::RankList,
            "ssd" => MessageType::SuperDanmu,
            "spbc" => MessageType::GiftBroadcast,
            "ggbb" => MessageType::RedPacket,
            "rankup" => MessageType::RankUp,
            other => MessageType::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MessageType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DanmuError;
    use crate::protocol::{Header, HEADER_SIZE};
    use bytes::Bytes;

    #[test]
    fn test_login_request_encoding() {
        let message = Message::login_request(288016);

        assert_eq!(message.body(), "type@=loginreq/roomid@=288016/");

        let bytes = message.encode().unwrap();
        let header = Header::decode(&bytes).unwrap();
        assert_eq!(header.length, 40);
        assert_eq!(header.length_dup, 40);
        assert_eq!(header.kind, KIND_TO_SERVER);
        assert_eq!(bytes.len(), HEADER_SIZE + 31 + 1);
    }

    #[test]
    fn test_join_group_encoding() {
        let message = Message::join_group(288016);
        assert_eq!(message.body(), "type@=joingroup/rid@=288016/gid@=-9999/");
    }

    #[test]
    fn test_keeplive_encoding() {
        let message = Message::keeplive(1_700_000_000);
        assert_eq!(message.body(), "type@=keeplive/tick@=1700000000/");
        assert_eq!(message.message_type(), Some(MessageType::Keeplive));
    }

    #[test]
    fn test_from_server_body() {
        let message = Message::from_server_body(b"type@=chatmsg/nn@=Alice/txt@=hi/").unwrap();

        assert_eq!(message.kind(), KIND_FROM_SERVER);
        assert_eq!(message.message_type(), Some(MessageType::ChatMessage));
        assert_eq!(message.field_str("nn"), Some("Alice"));
        assert_eq!(message.field_str("txt"), Some("hi"));
        assert_eq!(message.fields().len(), 3);
    }

    #[test]
    fn test_from_server_body_malformed() {
        let result = Message::from_server_body(b"type@=chatmsg/oops/");
        assert!(matches!(result, Err(DanmuError::MalformedBody(_))));
    }

    #[test]
    fn test_decode_frame_keeps_envelope() {
        let header = Header::new(9 + 14, KIND_FROM_SERVER, 0, 0);
        let frame = Frame::new(header, Bytes::from_static(b"type@=uenter/\0"));
        let message = Message::decode(&frame).unwrap();

        assert_eq!(message.kind(), KIND_FROM_SERVER);
        assert_eq!(message.secret(), 0);
        assert_eq!(message.reserved(), 0);
        assert_eq!(message.message_type(), Some(MessageType::UserEnter));
    }

    #[test]
    fn test_field_coercion() {
        let message = Message::from_server_body(b"type@=dgb/gfcnt@=3/nn@=Bob/").unwrap();
        assert_eq!(message.field_i64("gfcnt"), Some(3));
        assert_eq!(message.field_i64("nn"), None);
        assert!(message.field("missing").is_none());
    }

    #[test]
    fn test_set_field_replaces() {
        let mut message = Message::to_server();
        message.set_field("a", "1").set_field("a", 2);
        assert_eq!(message.body(), "a@=2/");
    }

    #[test]
    fn test_equality_ignores_field_order() {
        let a = Message::to_server().with_field("x", "1").with_field("y", "2");
        let b = Message::to_server().with_field("y", "2").with_field("x", "1");
        assert_eq!(a, b);
        assert_ne!(a, Message::from_server().with_field("x", "1").with_field("y", "2"));
    }

    #[test]
    fn test_message_without_type() {
        let message = Message::from_server_body(b"a@=b/").unwrap();
        assert!(message.message_type().is_none());
    }

    #[test]
    fn test_message_type_taxonomy() {
        let known = [
            "loginres",
            "keeplive",
            "chatmsg",
            "onlinegift",
            "dgb",
            "uenter",
            "bc_buy_deserve",
            "rss",
            "ranklist",
            "ssd",
            "spbc",
            "ggbb",
            "rankup",
        ];
        for name in known {
            let parsed = MessageType::from(name);
            assert!(!parsed.is_unknown(), "{} should be known", name);
            assert_eq!(parsed.as_str(), name);
        }
    }

    #[test]
    fn test_unknown_type_kept_verbatim() {
        let parsed = MessageType::from("noble_num_info");
        assert_eq!(parsed, MessageType::Unknown("noble_num_info".to_string()));
        assert_eq!(parsed.to_string(), "noble_num_info");
    }

    #[test]
    fn test_serialize_to_json() {
        let message = Message::from_server_body(b"type@=chatmsg/nn@=Alice/").unwrap();
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["kind"], 690);
        assert_eq!(json["fields"]["type"], "chatmsg");
        assert_eq!(json["fields"]["nn"], "Alice");
        assert_eq!(
            serde_json::to_string(&MessageType::RedPacket).unwrap(),
            "\"ggbb\""
        );
    }
}
