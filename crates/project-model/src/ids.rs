//! Identifier newtypes for project entities.
//!
//! Ids are allocated from a per-project counter and serialized as plain
//! integers, so a reloaded project keeps the ids its clips refer to.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }
    };
}

entity_id!(
    /// Identifies an imported media asset.
    AssetId,
    "asset"
);
entity_id!(
    /// Identifies a track.
    TrackId,
    "track"
);
entity_id!(
    /// Identifies a clip placed on a track.
    ClipId,
    "clip"
);
entity_id!(
    /// Links clips that move and select together.
    GroupId,
    "group"
);

/// Monotonic id source shared by every entity kind in a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdAllocator {
    last: u64,
}

impl IdAllocator {
    /// Return the next unused raw id.
    pub fn next_raw(&mut self) -> u64 {
        self.last += 1;
        self.last
    }

    /// Make sure future ids are greater than `seen`.
    pub fn observe(&mut self, seen: u64) {
        self.last = self.last.max(seen);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        assert_eq!(ClipId(4).to_string(), "clip-4");
        assert_eq!(GroupId(12).to_string(), "group-12");
    }

    #[test]
    fn test_allocator_skips_observed_ids() {
        let mut ids = IdAllocator::default();
        assert_eq!(ids.next_raw(), 1);
        ids.observe(10);
        assert_eq!(ids.next_raw(), 11);
        ids.observe(3);
        assert_eq!(ids.next_raw(), 12);
    }

    #[test]
    fn test_ids_serialize_as_integers() {
        let json = serde_json::to_string(&TrackId(3)).unwrap();
        assert_eq!(json, "3");
    }
}
