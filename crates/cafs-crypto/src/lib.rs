//! Hashing primitives for the content-addressable chunk store.
//!
//! Provides BLAKE2b tree-mode hashing for leaf and root digests and the
//! CRC-32C checksum used for checksum-verified blob writes.
//!
//! Both wrap established crates; nothing here implements a primitive itself.

pub mod checksum;
pub mod hasher;

pub use checksum::crc32c;
pub use hasher::TreeHasher;
