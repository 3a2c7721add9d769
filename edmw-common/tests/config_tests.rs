//! Integration tests for configuration resolution and graceful degradation
//!
//! Tests that manipulate EDMW_* environment variables are marked #[serial]
//! so they never run in parallel with each other.

use edmw_common::config::{
    load_config, read_toml_config, resolve_config_path, write_toml_config, TomlConfig,
    AI_API_KEY_ENV_VAR, CONFIG_ENV_VAR, PAS_CLIENT_ID_ENV_VAR, PAS_CLIENT_SECRET_ENV_VAR,
};
use edmw_common::Error;
use serial_test::serial;
use std::env;
use tempfile::TempDir;

fn clear_env() {
    env::remove_var(CONFIG_ENV_VAR);
    env::remove_var(PAS_CLIENT_ID_ENV_VAR);
    env::remove_var(PAS_CLIENT_SECRET_ENV_VAR);
    env::remove_var(AI_API_KEY_ENV_VAR);
}

#[test]
fn test_write_then_read_preserves_settings() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("config.toml");

    let mut config = TomlConfig::default();
    config.pas.client_id = Some("client".to_string());
    config.search.workers = 6;
    config.normalizer.top_n = 3;

    write_toml_config(&config, &path).unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("toml.tmp").exists());

    let loaded = read_toml_config(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
#[serial]
fn test_explicit_path_wins_over_env() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let explicit = temp_dir.path().join("explicit.toml");
    env::set_var(CONFIG_ENV_VAR, temp_dir.path().join("env.toml"));

    let resolved = resolve_config_path(Some(&explicit));
    assert_eq!(resolved, Some(explicit));

    clear_env();
}

#[test]
#[serial]
fn test_env_path_used_without_cli_arg() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let env_path = temp_dir.path().join("env.toml");
    std::fs::write(&env_path, "[search]\nworkers = 2\n").unwrap();
    env::set_var(CONFIG_ENV_VAR, &env_path);

    let config = load_config(None).unwrap();
    assert_eq!(config.search.workers, 2);

    clear_env();
}

#[test]
#[serial]
fn test_missing_explicit_file_is_an_error() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.toml");

    let result = load_config(Some(&missing));
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[test]
#[serial]
fn test_unparseable_discovered_file_falls_back_to_defaults() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "this is = = not toml").unwrap();
    env::set_var(CONFIG_ENV_VAR, &path);

    let config = load_config(None).unwrap();
    assert_eq!(config.search, TomlConfig::default().search);

    clear_env();
}

#[test]
#[serial]
fn test_env_secrets_override_toml() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[pas]\nclient_id = \"from-toml\"\nclient_secret = \"toml-secret\"\n",
    )
    .unwrap();

    env::set_var(PAS_CLIENT_ID_ENV_VAR, "from-env");
    env::set_var(AI_API_KEY_ENV_VAR, "   ");

    let config = load_config(Some(&path)).unwrap();
    assert_eq!(config.pas.client_id.as_deref(), Some("from-env"));
    assert_eq!(config.pas.client_secret.as_deref(), Some("toml-secret"));
    // Blank ENV values are ignored
    assert!(!config.ai.is_enabled());

    clear_env();
}

#[test]
#[serial]
fn test_invalid_thresholds_rejected_on_load() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[normalizer]\nhigh_confidence = 50\nambiguous_floor = 70\n",
    )
    .unwrap();

    let result = load_config(Some(&path));
    assert!(matches!(result, Err(Error::Config(_))));
}
