//! Per-container settings.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Container versioning status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersioningStatus {
    /// Versioning has never been enabled. Writes replace the live version.
    #[default]
    Unversioned,
    /// Every write creates a new retained version.
    Enabled,
    /// Versioning was enabled and is now suspended. Writes replace the live
    /// unversioned version while older versions are kept.
    Suspended,
}

impl VersioningStatus {
    /// Whether writes in this state create unversioned nodes.
    #[must_use]
    pub fn writes_unversioned(self) -> bool {
        self != Self::Enabled
    }
}

/// Mutable settings of one container.
#[derive(Debug, Default)]
pub struct ContainerSettings {
    versioning: RwLock<VersioningStatus>,
}

impl ContainerSettings {
    /// Current versioning status.
    #[must_use]
    pub fn versioning(&self) -> VersioningStatus {
        *self.versioning.read()
    }

    /// Replace the versioning status, returning the previous one.
    pub fn set_versioning(&self, status: VersioningStatus) -> VersioningStatus {
        std::mem::replace(&mut *self.versioning.write(), status)
    }
}
