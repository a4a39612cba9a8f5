//! Integration tests for config

#[cfg(test)]
mod tests {
    use osup_config::*;
    use osup_errors::{ConfigError, Error};
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to ensure env var tests don't run concurrently
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_VARS: [&str; 7] = [
        "OSUP_PATH",
        "OSUP_STATE_DIR",
        "OSUP_CONTENT_URL",
        "OSUP_VERSION_URL",
        "OSUP_MAX_PARALLEL_DOWNLOADS",
        "OSUP_MAX_RETRIES",
        "OSUP_RETRY_DELAY",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[general]
max_parallel_downloads = 4

[paths]
install_root = "/mnt/target"
state_dir = "/mnt/target/var/lib/osup"

[network]
content_url = "https://cdn.example.com/update/"
retries = 5
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.general.max_parallel_downloads, 4);
        assert_eq!(config.paths.install_root, PathBuf::from("/mnt/target"));
        assert_eq!(
            config.paths.mix_state_dir,
            PathBuf::from(fixed_paths::DEFAULT_MIX_STATE_DIR)
        );
        assert_eq!(config.network.retries, 5);
        assert_eq!(config.network.retry_delay, 1);
        assert_eq!(
            config.content_url(),
            Some("https://cdn.example.com/update")
        );
        assert_eq!(
            config.bundles_path(),
            PathBuf::from("/mnt/target/usr/share/osup/bundles")
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let err = Config::load_from_file(std::path::Path::new("/nonexistent/osup.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::NotFound { .. })));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.general.max_parallel_downloads, 1);
        assert_eq!(config.paths.state_dir, PathBuf::from("/var/lib/osup"));
        assert!(config.validate(false).is_ok());
        assert!(config.validate(true).is_err());
    }

    #[test]
    fn test_merge_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("OSUP_STATE_DIR", "/tmp/osup-state");
        std::env::set_var("OSUP_CONTENT_URL", "https://cdn.example.com");
        std::env::set_var("OSUP_MAX_PARALLEL_DOWNLOADS", "3");
        std::env::set_var("OSUP_MAX_RETRIES", "0");

        let mut config = Config::default();
        config.merge_env().unwrap();

        assert_eq!(config.paths.state_dir, PathBuf::from("/tmp/osup-state"));
        assert_eq!(config.general.max_parallel_downloads, 3);
        assert_eq!(config.network.retries, 0);
        assert!(config.validate(true).is_ok());

        clear_env();
    }

    #[test]
    fn test_invalid_env_value() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("OSUP_RETRY_DELAY", "soon");

        let mut config = Config::default();
        let result = config.merge_env();
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidValue { .. }))
        ));

        clear_env();
    }

    #[test]
    fn test_validate_rejects_zero_downloads() {
        let mut config = Config::default();
        config.general.max_parallel_downloads = 0;
        assert!(config.validate(false).is_err());
    }

    #[test]
    fn test_latest_version_url() {
        let mut config = Config::default();
        assert!(config.latest_version_url().is_none());
        config.network.version_url = Some("https://v.example.com/".into());
        config.network.format = "30".into();
        assert_eq!(
            config.latest_version_url().as_deref(),
            Some("https://v.example.com/version/format30/latest")
        );
    }
}
