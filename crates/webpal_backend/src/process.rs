use tracing::{debug, instrument};

use webpal_base::pal::HostHandle;
use webpal_base::{PalResult, ReturnCode};

use crate::native::encode_utf8;

/// The host cannot spawn processes.
pub fn start_game(_args: &str) -> PalResult<()> {
    Err(ReturnCode::NOT_SUPPORTED)
}

pub fn exit(code: i32) -> ! {
    std::process::exit(code)
}

/// Open `url` (code page 437) with the host, usually in a new browser tab.
#[instrument(skip(host, url))]
pub fn start_open(host: &HostHandle, url: &[u8]) -> PalResult<()> {
    let url = encode_utf8(url);
    debug!(%url, "opening");
    host.open_url(&url)
}

/// Self-updating. The host page is always the current build, so there is nothing to update.
pub mod updater {
    use webpal_base::{PalResult, ReturnCode};

    pub fn build_time() -> PalResult<u64> {
        Err(ReturnCode::NOT_SUPPORTED)
    }

    /// Nothing is left behind by an update, so cleaning always succeeds.
    pub fn clean() -> bool {
        true
    }

    pub fn start() -> PalResult<()> {
        Err(ReturnCode::NOT_SUPPORTED)
    }

    pub fn mark_executable() -> PalResult<()> {
        Ok(())
    }

    pub fn set_new_build_time(_time: u64) -> PalResult<()> {
        Err(ReturnCode::NOT_SUPPORTED)
    }
}
