use std::sync::OnceLock;

use copyvio_common::observability::{LogConfig, LogFormat};

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "copyvio-tests",
            log_dir: Some(std::env::temp_dir().join("copyvio-tests")),
            emit_stderr: true,
            format: LogFormat::from_env("COPYVIO_LOG_FORMAT"),
            default_filter: "debug",
        };

        copyvio_common::observability::init_logging(config).unwrap_or_default()
    });
}
