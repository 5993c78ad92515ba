use std::io::Read;

use serde::Deserialize;
use tracing::{debug, instrument};

use webpal_base::pal::HostHandle;
use webpal_base::{FilePath, ResultExt, ReturnCode, WebPalError, WebPalResult};

use crate::file::File;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "webpal.toml";

/// Tunables of the backend. Every field has a default, so an empty or missing file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PalConfig {
    /// Directory made current at startup.
    pub default_directory: String,
    /// Upper bound on the command-line arguments handed to the application.
    pub max_command_args: usize,
    /// Error messages are cut to this many characters before being logged.
    pub error_log_limit: usize,
}

impl Default for PalConfig {
    fn default() -> Self {
        Self {
            default_directory: "/classicube".to_string(),
            max_command_args: 5,
            error_log_limit: 128,
        }
    }
}

/// Load the configuration at `path` through the host filesystem.
///
/// A missing file yields the defaults; any other failure is an error.
#[instrument(skip(host), fields(path = %path))]
pub fn load_config(host: &HostHandle, path: &FilePath) -> WebPalResult<PalConfig> {
    let mut file = match File::open(host, path) {
        Ok(file) => file,
        Err(code) if code == ReturnCode::FILE_NOT_FOUND => {
            debug!("no configuration file, using defaults");
            return Ok(PalConfig::default());
        }
        Err(code) => {
            return Err(WebPalError::platform(code)
                .context(format!("opening configuration {}", path))
                .into());
        }
    };

    let mut content = String::new();
    file.read_to_string(&mut content)
        .with_context(|| format!("reading configuration {}", path))?;
    file.close()
        .with_context(|| format!("closing configuration {}", path))?;

    let config: PalConfig = toml::from_str(&content)
        .map_err(|e| webpal_base::err!("invalid TOML: {}", e))
        .with_context(|| format!("parsing configuration {}", path))?;
    debug!(?config, "configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use webpal_base::errno::native;
    use webpal_base::{ErrorKind, MockHost};

    fn host_with(content: Option<&str>) -> HostHandle {
        let mock = MockHost::new();
        if let Some(content) = content {
            mock.add_file(CONFIG_FILE, content.as_bytes().to_vec());
        }
        HostHandle::new(mock)
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let host = host_with(None);
        let config = load_config(&host, &FilePath::from(CONFIG_FILE)).unwrap();
        assert_eq!(config, PalConfig::default());
        assert_eq!(config.default_directory, "/classicube");
        assert_eq!(config.max_command_args, 5);
        assert_eq!(config.error_log_limit, 128);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let host = host_with(Some("error_log_limit = 64\n"));
        let config = load_config(&host, &FilePath::from(CONFIG_FILE)).unwrap();
        assert_eq!(config.error_log_limit, 64);
        assert_eq!(config.default_directory, "/classicube");
    }

    #[test]
    fn test_full_file() {
        let host = host_with(Some(
            r#"
default_directory = "/games"
max_command_args = 8
error_log_limit = 256
"#,
        ));
        let config = load_config(&host, &FilePath::from(CONFIG_FILE)).unwrap();
        assert_eq!(
            config,
            PalConfig {
                default_directory: "/games".to_string(),
                max_command_args: 8,
                error_log_limit: 256,
            }
        );
    }

    #[test]
    fn test_invalid_toml_is_reported_with_context() {
        let host = host_with(Some("this is not valid toml {{{}}}"));
        let err = load_config(&host, &FilePath::from(CONFIG_FILE)).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("parsing configuration webpal.toml: invalid TOML"));
    }

    #[test]
    fn test_read_failure_keeps_io_kind() {
        let mock = MockHost::new();
        mock.add_file(CONFIG_FILE, vec![0xff, 0xfe, b'=', b'1']);
        let host = HostHandle::new(mock);

        let err = load_config(&host, &FilePath::from(CONFIG_FILE)).unwrap_err();
        match err.kind() {
            ErrorKind::Io { source } => assert_eq!(source.kind(), io::ErrorKind::InvalidData),
            other => panic!("unexpected kind {:?}", other),
        }
        assert_eq!(err.get_context(), ["reading configuration webpal.toml"]);
    }

    #[test]
    fn test_open_failure_carries_return_code() {
        let mock = MockHost::new();
        let denied = ReturnCode::new(native::EACCES).unwrap();
        mock.fail_open(CONFIG_FILE, denied);
        let host = HostHandle::new(mock);

        let err = load_config(&host, &FilePath::from(CONFIG_FILE)).unwrap_err();
        assert_eq!(err.return_code(), Some(denied));
        assert_eq!(err.get_context(), ["opening configuration webpal.toml"]);
    }
}
