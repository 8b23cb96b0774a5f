//! Self-describing entry encoding.
//!
//! Frame layout: `[4 bytes BE length][1 byte codec version][payload]`, where
//! `length` counts the version byte plus the payload, and the payload is the
//! bincode encoding of an [`EntryDocument`]. Fields live in a `BTreeMap`, so
//! the same logical content always produces the same bytes.

use std::collections::BTreeMap;

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use quill_crypto::DomainHasher;
use quill_types::{AgentId, ContentHash, EntryRef};

use crate::error::{CodecError, CodecResult};

/// Current frame version.
pub const CODEC_VERSION: u8 = 1;

/// Largest accepted payload (16 MiB).
pub const MAX_ENTRY_SIZE: usize = 16 * 1024 * 1024;

const HEADER_LEN: usize = 5;

/// A tagged field value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Bytes(Vec<u8>),
    Int(i64),
    Bool(bool),
    Agent(AgentId),
    Ref(EntryRef),
}

impl FieldValue {
    /// Name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Int(_) => "int",
            Self::Bool(_) => "bool",
            Self::Agent(_) => "agent",
            Self::Ref(_) => "ref",
        }
    }
}

/// Field name → value, kept sorted by name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap(BTreeMap<String, FieldValue>);

macro_rules! typed_getter {
    ($fn_name:ident, $variant:ident, $ty:ty, $expected:literal) => {
        pub fn $fn_name(&self, field: &str) -> CodecResult<&$ty> {
            match self.require(field)? {
                FieldValue::$variant(value) => Ok(value),
                other => Err(CodecError::WrongFieldType {
                    field: field.to_string(),
                    expected: $expected,
                    found: other.kind(),
                }),
            }
        }
    };
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: FieldValue) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.0.insert(field.into(), value)
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    fn require(&self, field: &str) -> CodecResult<&FieldValue> {
        self.0
            .get(field)
            .ok_or_else(|| CodecError::MissingField(field.to_string()))
    }

    typed_getter!(text, Text, String, "text");
    typed_getter!(bytes, Bytes, Vec<u8>, "bytes");
    typed_getter!(int, Int, i64, "int");
    typed_getter!(boolean, Bool, bool, "bool");
    typed_getter!(agent, Agent, AgentId, "agent");
    typed_getter!(entry_ref, Ref, EntryRef, "ref");
}

/// An application entry type that can be reduced to a field map.
pub trait AppEntry: Sized {
    /// Stable type name written into every encoded document.
    const ENTRY_TYPE: &'static str;

    fn to_fields(&self) -> FieldMap;

    fn from_fields(fields: &FieldMap) -> CodecResult<Self>;
}

/// Decoded, self-describing form of a stored entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDocument {
    pub entry_type: String,
    pub fields: FieldMap,
}

impl EntryDocument {
    pub fn new(entry_type: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            entry_type: entry_type.into(),
            fields,
        }
    }

    pub fn from_entry<E: AppEntry>(entry: &E) -> Self {
        Self::new(E::ENTRY_TYPE, entry.to_fields())
    }

    /// Decode into a typed entry, checking the type name first.
    pub fn to_entry<E: AppEntry>(&self) -> CodecResult<E> {
        if self.entry_type != E::ENTRY_TYPE {
            return Err(CodecError::WrongEntryType {
                expected: E::ENTRY_TYPE.to_string(),
                found: self.entry_type.clone(),
            });
        }
        E::from_fields(&self.fields)
    }

    /// Encode into a length-prefixed frame.
    pub fn encode(&self) -> CodecResult<Bytes> {
        let payload =
            bincode::serialize(self).map_err(|e| CodecError::Serialization(e.to_string()))?;
        if payload.len() > MAX_ENTRY_SIZE {
            return Err(CodecError::EntryTooLarge {
                size: payload.len(),
                max: MAX_ENTRY_SIZE,
            });
        }
        let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
        buf.put_u32((payload.len() + 1) as u32);
        buf.put_u8(CODEC_VERSION);
        buf.put_slice(&payload);
        Ok(buf.freeze())
    }

    /// Decode a complete frame. Trailing bytes are an error.
    pub fn decode(data: &[u8]) -> CodecResult<Self> {
        if data.len() < HEADER_LEN {
            return Err(CodecError::Truncated {
                needed: HEADER_LEN,
                available: data.len(),
            });
        }
        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&data[..4]);
        let len = u32::from_be_bytes(len_bytes) as usize;
        if len == 0 {
            return Err(CodecError::Truncated {
                needed: HEADER_LEN,
                available: 4,
            });
        }
        if len - 1 > MAX_ENTRY_SIZE {
            return Err(CodecError::EntryTooLarge {
                size: len - 1,
                max: MAX_ENTRY_SIZE,
            });
        }
        let total = 4 + len;
        if data.len() < total {
            return Err(CodecError::Truncated {
                needed: total,
                available: data.len(),
            });
        }
        if data.len() > total {
            return Err(CodecError::TrailingBytes {
                extra: data.len() - total,
            });
        }
        if data[4] != CODEC_VERSION {
            return Err(CodecError::UnsupportedVersion(data[4]));
        }
        bincode::deserialize(&data[HEADER_LEN..total])
            .map_err(|e| CodecError::Serialization(e.to_string()))
    }

    /// Address this document would be stored under.
    pub fn content_hash(&self) -> CodecResult<ContentHash> {
        Ok(DomainHasher::content_hash(&self.encode()?))
    }
}
