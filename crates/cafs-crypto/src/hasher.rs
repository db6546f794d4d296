use blake2b_simd::Params;
use cafs_types::{ContentKey, KEY_SIZE};

/// Depth of the hash tree: the leaf level plus one combining level.
const MAX_DEPTH: u8 = 2;

/// BLAKE2b tree-mode hasher for leaves and stream roots.
///
/// A leaf digest is bound to the leaf's bytes, its 0-based position in the
/// stream, the configured leaf size and whether it is the final leaf. The
/// same bytes at two different positions therefore hash to different keys.
///
/// The root digest combines every leaf key in order at node depth 1 with
/// the last-node flag set, so reordering, adding or dropping a leaf changes
/// the root.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeHasher {
    leaf_size: u32,
}

impl TreeHasher {
    /// Hasher for streams split into `leaf_size`-byte leaves.
    pub const fn new(leaf_size: u32) -> Self {
        Self { leaf_size }
    }

    /// The configured leaf size.
    pub fn leaf_size(&self) -> u32 {
        self.leaf_size
    }

    /// Digest of the leaf at `index`.
    pub fn leaf(&self, index: u64, data: &[u8], is_last: bool) -> ContentKey {
        let hash = self.params(index, 0, is_last).hash(data);
        ContentKey::from(*hash.as_array())
    }

    /// Digest of a whole stream from its ordered leaf keys.
    pub fn root(&self, leaves: &[ContentKey]) -> ContentKey {
        let mut state = self.params(0, 1, true).to_state();
        for leaf in leaves {
            state.update(leaf.as_bytes());
        }
        ContentKey::from(*state.finalize().as_array())
    }

    fn params(&self, node_offset: u64, node_depth: u8, last_node: bool) -> Params {
        let mut params = Params::new();
        params
            .hash_length(KEY_SIZE)
            .fanout(0)
            .max_depth(MAX_DEPTH)
            .max_leaf_length(self.leaf_size)
            .node_offset(node_offset)
            .node_depth(node_depth)
            .inner_hash_length(KEY_SIZE)
            .last_node(last_node);
        params
    }
}
