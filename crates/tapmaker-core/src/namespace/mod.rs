//! Linux namespace handles.
//!
//! Provides safe wrappers around `setns(2)` for entering the network
//! namespace of another process and coming back.

pub mod network;

use std::os::unix::fs::MetadataExt;

pub use network::{NamespaceGuard, NetNamespace};

/// Kernel identity of a namespace.
///
/// Two namespace files refer to the same namespace exactly when their
/// device and inode numbers match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NamespaceId {
    /// Device number of the nsfs mount.
    pub dev: u64,
    /// Inode number of the namespace.
    pub ino: u64,
}

impl NamespaceId {
    pub(crate) fn from_metadata(meta: &std::fs::Metadata) -> Self {
        Self {
            dev: meta.dev(),
            ino: meta.ino(),
        }
    }
}

impl std::fmt::Display for NamespaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "net:[{}]", self.ino)
    }
}
