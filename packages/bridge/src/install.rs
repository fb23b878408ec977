//! Plugin installation against the native runtime.

use std::sync::Arc;

use tracing::debug;

use crate::dispatch::{callback_table, BridgeState};
use crate::error::InstallError;
use crate::host::VfsHost;

/// Reserved path prefix that routes runtime I/O to this plugin.
pub const PLUGIN_PREFIX: &str = "/gatefs/";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    AlreadyInstalled,
}

/// Install the callback table under [`PLUGIN_PREFIX`].
///
/// The runtime is asked for its known prefixes first, so repeated calls are
/// no-ops; installation is expected once per process per runtime. The table
/// handed over carries one strong reference to `state` in its `user_data`,
/// reclaimed by [`uninstall`].
pub fn install(host: &dyn VfsHost, state: &Arc<BridgeState>) -> Result<InstallOutcome, InstallError> {
    if host.known_prefixes().iter().any(|p| p == PLUGIN_PREFIX) {
        return Ok(InstallOutcome::AlreadyInstalled);
    }
    host.install_handler(PLUGIN_PREFIX, callback_table(state))?;
    debug!(prefix = PLUGIN_PREFIX, "plugin installed");
    Ok(InstallOutcome::Installed)
}

/// Remove the plugin and release the state reference its table holds.
///
/// The user data is cleared while the runtime's bookkeeping is being torn
/// down, so no callback can run against a dangling state pointer afterwards;
/// invoking callbacks after uninstall is a caller error, per the handler
/// contract.
pub fn uninstall(host: &dyn VfsHost) -> Result<(), InstallError> {
    let table = host
        .remove_handler(PLUGIN_PREFIX)?
        .ok_or(InstallError::NotInstalled)?;
    // Reclaim the strong reference handed out at install time.
    unsafe { drop(Arc::from_raw(table.user_data as *const BridgeState)) };
    debug!(prefix = PLUGIN_PREFIX, "plugin uninstalled");
    Ok(())
}

/// The synthetic path that routes `urlpath` through the plugin.
pub fn vsi_path(urlpath: &str) -> String {
    format!("{}{}", PLUGIN_PREFIX, urlpath)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;

    #[test]
    fn install_is_idempotent() {
        let host = MemoryHost::new();
        let state = BridgeState::new();

        assert_eq!(install(&host, &state).unwrap(), InstallOutcome::Installed);
        assert_eq!(
            install(&host, &state).unwrap(),
            InstallOutcome::AlreadyInstalled
        );
        assert_eq!(host.known_prefixes(), vec![PLUGIN_PREFIX.to_string()]);

        uninstall(&host).unwrap();
    }

    #[test]
    fn uninstall_without_install_is_an_error() {
        let host = MemoryHost::new();
        assert!(matches!(
            uninstall(&host),
            Err(InstallError::NotInstalled)
        ));
    }

    #[test]
    fn install_uninstall_releases_state() {
        let host = MemoryHost::new();
        let state = BridgeState::new();

        install(&host, &state).unwrap();
        uninstall(&host).unwrap();

        // Reinstall works against the same state after a full teardown.
        assert_eq!(install(&host, &state).unwrap(), InstallOutcome::Installed);
        uninstall(&host).unwrap();
    }

    #[test]
    fn vsi_path_prepends_the_reserved_prefix() {
        assert_eq!(vsi_path("data/a.tif"), "/gatefs/data/a.tif");
        assert_eq!(vsi_path("/data/a.tif"), "/gatefs//data/a.tif");
        assert_eq!(
            vsi_path("s3://bucket/a.tif"),
            "/gatefs/s3://bucket/a.tif"
        );
    }
}
