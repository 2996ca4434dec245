use std::path::Path;
use std::time::Duration;

use pgsql_lsp::Config;
use pgsql_lsp::config::{ConfigError, WORKSPACE_CONFIG_FILE};

#[test]
fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.workspace.include, vec!["**/*.sql", "**/*.SQL"]);
    assert_eq!(config.workspace.exclude, vec!["**/node_modules/**"]);
    assert!(config.cache.enabled);
    assert_eq!(config.cache.debounce(), Duration::from_millis(500));
    assert!(config.completion.keywords);
}

#[test]
fn test_parse_kebab_case_keys() {
    let config = Config::from_toml_str(
        r#"
[workspace]
include = ["db/**/*.sql"]

[cache]
debounce-ms = 25

[completion]
keywords = false
"#,
        Path::new("pgsql-lsp.toml"),
    )
    .unwrap();

    assert_eq!(config.workspace.include, vec!["db/**/*.sql"]);
    // Keys left out keep their defaults.
    assert_eq!(config.workspace.exclude, vec!["**/node_modules/**"]);
    assert!(config.cache.enabled);
    assert_eq!(config.cache.debounce_ms, 25);
    assert!(!config.completion.keywords);
}

#[test]
fn test_empty_file_is_all_defaults() {
    let config = Config::from_toml_str("", Path::new("empty.toml")).unwrap();
    assert!(config.cache.enabled);
    assert!(config.completion.keywords);
}

#[test]
fn test_parse_error_names_the_file() {
    let err = Config::from_toml_str("[cache]\nenabled = \"yes\"\n", Path::new("bad.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().starts_with("invalid configuration in bad.toml"));
}

#[test]
fn test_locate_prefers_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(WORKSPACE_CONFIG_FILE), "").unwrap();
    let explicit = dir.path().join("custom.toml");

    assert_eq!(
        Config::locate(Some(&explicit), Some(dir.path())),
        Some(explicit.clone())
    );
    assert_eq!(
        Config::locate(None, Some(dir.path())),
        Some(dir.path().join(WORKSPACE_CONFIG_FILE))
    );
}

#[test]
fn test_load_workspace_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(WORKSPACE_CONFIG_FILE),
        "[cache]\nenabled = false\n",
    )
    .unwrap();
    let config = Config::load(None, Some(dir.path()));
    assert!(!config.cache.enabled);
}

#[test]
fn test_load_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();

    // Missing explicit file.
    let missing = dir.path().join("missing.toml");
    let config = Config::load(Some(&missing), Some(dir.path()));
    assert!(config.cache.enabled);

    // Unparseable file.
    let broken = dir.path().join("broken.toml");
    std::fs::write(&broken, "[cache\n").unwrap();
    let config = Config::load(Some(&broken), None);
    assert!(config.completion.keywords);
}

#[test]
fn test_from_file_io_error() {
    let err = Config::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}
