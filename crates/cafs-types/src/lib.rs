//! Foundation types for the content-addressable chunk store.
//!
//! Every stored leaf and every stream root is addressed by a [`ContentKey`]:
//! a fixed-size BLAKE2b digest with a lowercase hex text form. The ordered
//! list of leaf keys for a stream (its leaf directory) is persisted as the
//! flat concatenation produced by [`encode_keys`].

pub mod error;
pub mod key;

pub use error::KeyError;
pub use key::{decode_keys, encode_keys, ContentKey, KEY_SIZE, KEY_SIZE_HEX};
