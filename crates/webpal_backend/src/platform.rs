use tracing::{info, instrument, warn};

use webpal_base::pal::HostHandle;
use webpal_base::{FilePath, PalResult};

use crate::config::PalConfig;

/// Bring up the host module and its socket shim, then report a failed storage preload.
///
/// A preload failure is not fatal, but anything saved earlier is gone, so the user is told
/// through the host log.
#[instrument(skip_all)]
pub fn init(host: &HostHandle) {
    host.init_module();
    host.init_sockets();

    let Some(error) = host.storage_error() else {
        info!("platform initialised");
        return;
    };
    warn!(%error, "persistent storage failed to preload");
    host.log(&format!("&cError preloading IndexedDB: {}", error));
    host.log("&cPreviously saved settings/maps will be lost");
}

pub fn free(_host: &HostHandle) {}

pub fn log(host: &HostHandle, message: &str) {
    host.log(message);
}

/// Log an error reported by the host page, cut to `error_log_limit` characters.
pub fn log_error(host: &HostHandle, config: &PalConfig, message: &str) {
    let message: String = message.chars().take(config.error_log_limit).collect();
    warn!(%message, "host error");
    host.log(&message);
}

/// Make the configured default directory current.
pub fn set_default_current_directory(host: &HostHandle, config: &PalConfig) -> PalResult<()> {
    host.change_dir(&FilePath::from(config.default_directory.as_str()))
}
