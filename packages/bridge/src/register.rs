//! Collaborator-facing registration API.

use tracing::debug;

use gatefs_opener::Opener;

use crate::dispatch::BridgeState;
use crate::error::RegistrationError;
use crate::install::vsi_path;
use crate::key::{ModeClass, RegistrationKey};
use crate::registry::RegistrationGuard;

/// An active registration scope.
///
/// Holds the registry binding and the synthetic path a collaborator hands
/// to the runtime. Dropping it unregisters; opens for the key then fail
/// cleanly, which back-pressures anything still trying to reach the
/// resource after the surrounding operation ended.
pub struct Registration {
    vsi_path: String,
    _guard: RegistrationGuard,
}

impl Registration {
    /// The synthetic path to open through the runtime.
    pub fn vsi_path(&self) -> &str {
        &self.vsi_path
    }
}

impl BridgeState {
    /// Register `opener` for `urlpath` under access mode `mode`, yielding
    /// the synthetic path to hand to the runtime.
    ///
    /// The opener is validated before the key is bound, so a malformed
    /// opener fails here rather than at its first callback. Registering a
    /// clone of an already-registered opener for the same key nests
    /// silently; registering a different opener for an active key is a
    /// [`RegistrationError::Conflict`].
    pub fn register(
        &self,
        urlpath: &str,
        mode: &str,
        opener: Opener,
    ) -> Result<Registration, RegistrationError> {
        let class = ModeClass::parse(mode)?;
        opener
            .validate()
            .map_err(|source| RegistrationError::Probe { source })?;

        let key = RegistrationKey::for_path(urlpath, class);
        let guard = self.registry.register(key, opener)?;
        debug!(urlpath, mode, "registration active");
        Ok(Registration {
            vsi_path: vsi_path(urlpath),
            _guard: guard,
        })
    }
}
