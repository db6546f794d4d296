use std::sync::Arc;

use cafs_types::ContentKey;

/// Maps a content key to the store path it lives under.
pub type Pather = Arc<dyn Fn(&ContentKey) -> String + Send + Sync>;

/// The default layout: `prefix` followed by the lowercase hex key.
pub fn prefix_pather(prefix: impl Into<String>) -> Pather {
    let prefix = prefix.into();
    Arc::new(move |key: &ContentKey| key.to_hex_with_prefix(&prefix))
}
