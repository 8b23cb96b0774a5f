use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{parse_32, TypeError};

macro_rules! digest_id {
    ($(#[$meta:meta])* $name:ident, $debug_tag:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name([u8; 32]);

        impl $name {
            /// Wrap a pre-computed 32-byte digest.
            pub const fn from_raw(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// The raw 32-byte digest.
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Full hex encoding (64 characters).
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// First 8 hex characters, for logs.
            pub fn short_hex(&self) -> String {
                hex::encode(&self.0[..4])
            }

            /// Parse from a 64-character hex string.
            pub fn from_hex(s: &str) -> Result<Self, TypeError> {
                parse_32(s).map(Self)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($debug_tag, "({})"), self.short_hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }
    };
}

digest_id!(
    /// Address of immutable entry content.
    ///
    /// Produced by hashing the encoded entry bytes, so identical logical
    /// content always lands on the same `ContentHash`.
    ContentHash,
    "ContentHash"
);

digest_id!(
    /// Identity of a single write action (create, update, delete, create-link,
    /// delete-link).
    ///
    /// Distinct from [`ContentHash`]: two creates of identical content yield one
    /// `ContentHash` but two `ActionId`s, because the action hash covers the
    /// author, timestamp and source-chain position as well.
    ActionId,
    "ActionId"
);
