//! Container setting handlers.

use tracing::info;
use treegate_core::ContainerId;

use crate::provider::ObjectLayer;
use crate::state::VersioningStatus;

impl ObjectLayer {
    /// Set the versioning status of a container, returning the previous one.
    /// Existing versions are unaffected.
    pub fn put_container_versioning(
        &self,
        container: &ContainerId,
        status: VersioningStatus,
    ) -> VersioningStatus {
        let previous = self.settings_of(container).set_versioning(status);
        info!(container = %container, ?previous, ?status, "set container versioning");
        previous
    }

    /// The versioning status of a container.
    #[must_use]
    pub fn get_container_versioning(&self, container: &ContainerId) -> VersioningStatus {
        self.settings_of(container).versioning()
    }
}
