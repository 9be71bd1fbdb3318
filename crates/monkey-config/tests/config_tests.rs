//! Configuration loading and precedence tests

use monkey_config::{ConfigError, ConfigLoader, MonkeyConfig, VmConfig};
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn create_config_file(dir: &Path, content: &str) -> PathBuf {
    let config_path = dir.join("monkey.toml");
    fs::write(&config_path, content).unwrap();
    config_path
}

/// Loader that never sees the real ~/.monkey/config.toml
fn loader_without_global(temp_dir: &TempDir) -> ConfigLoader {
    ConfigLoader::with_global_config(temp_dir.path().join("absent-global.toml"))
}

// ============================================================================
// Config Loading Tests
// ============================================================================

#[test]
#[serial]
fn test_load_project_config_basic() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(
        temp_dir.path(),
        r#"
[vm]
stack_size = 4096

[repl]
prompt = "🐒 "
"#,
    );

    let loaded = loader_without_global(&temp_dir)
        .load_from_directory(temp_dir.path())
        .unwrap();

    assert!(loaded.is_project());
    assert_eq!(loaded.config.vm.stack_size, 4096);
    assert_eq!(loaded.config.vm.max_frames, 1024);
    assert_eq!(loaded.config.repl.prompt, "🐒 ");
}

#[test]
#[serial]
fn test_load_when_no_config_exists() {
    let temp_dir = TempDir::new().unwrap();

    let loaded = loader_without_global(&temp_dir)
        .load_from_directory(temp_dir.path())
        .unwrap();

    assert!(!loaded.is_project());
    assert!(loaded.sources.is_empty());
    assert_eq!(loaded.config, MonkeyConfig::default());
}

#[test]
#[serial]
fn test_load_from_subdirectory_finds_parent() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[vm]\nmax_frames = 100\n");

    let nested = temp_dir.path().join("sub1").join("sub2");
    fs::create_dir_all(&nested).unwrap();

    let loaded = loader_without_global(&temp_dir)
        .load_from_directory(&nested)
        .unwrap();

    assert_eq!(loaded.config.vm.max_frames, 100);
    assert_eq!(loaded.project_root.as_deref(), Some(temp_dir.path()));
}

#[test]
#[serial]
fn test_nearest_config_wins() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[vm]\nmax_frames = 100\n");
    let inner = temp_dir.path().join("inner");
    fs::create_dir(&inner).unwrap();
    create_config_file(&inner, "[vm]\nmax_frames = 200\n");

    let loaded = loader_without_global(&temp_dir)
        .load_from_directory(&inner)
        .unwrap();

    assert_eq!(loaded.config.vm.max_frames, 200);
}

#[test]
#[serial]
fn test_load_with_empty_config() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "");

    let loaded = loader_without_global(&temp_dir)
        .load_from_directory(temp_dir.path())
        .unwrap();

    assert!(loaded.is_project());
    assert_eq!(loaded.config, MonkeyConfig::default());
}

#[test]
#[serial]
fn test_load_from_specific_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("custom.toml");
    fs::write(&path, "[repl]\nhistory = false\n").unwrap();

    let loaded = loader_without_global(&temp_dir).load_from_file(&path).unwrap();

    assert!(!loaded.config.repl.history);
    assert_eq!(loaded.sources, vec![path]);
}

#[test]
fn test_load_from_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("missing.toml");

    match loader_without_global(&temp_dir).load_from_file(&path) {
        Err(ConfigError::NotFound(p)) => assert_eq!(p, path),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

// ============================================================================
// Invalid Config Tests
// ============================================================================

#[test]
#[serial]
fn test_invalid_toml_syntax() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[vm\nstack_size = ");

    let result = loader_without_global(&temp_dir).load_from_directory(temp_dir.path());
    assert!(matches!(result, Err(ConfigError::TomlParseError { .. })));
}

#[test]
#[serial]
fn test_unknown_section_rejected() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[compiler]\noptimize = true\n");

    let result = loader_without_global(&temp_dir).load_from_directory(temp_dir.path());
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_wrong_value_type_rejected() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[vm]\nstack_size = \"big\"\n");

    let result = loader_without_global(&temp_dir).load_from_directory(temp_dir.path());
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_zero_limit_rejected_after_merge() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[vm]\nmax_frames = 0\n");

    let result = loader_without_global(&temp_dir).load_from_directory(temp_dir.path());
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

#[test]
fn test_load_single_file_validates() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), "[vm]\nglobals_size = 100000\n");

    assert!(MonkeyConfig::load_from_file(&path).is_err());
}

// ============================================================================
// Precedence Tests
// ============================================================================

#[test]
#[serial]
fn test_global_then_project_then_env() {
    let temp_dir = TempDir::new().unwrap();
    let global = temp_dir.path().join("global.toml");
    fs::write(
        &global,
        "[vm]\nstack_size = 100\nmax_frames = 10\nglobals_size = 1000\n",
    )
    .unwrap();

    let project = temp_dir.path().join("project");
    fs::create_dir(&project).unwrap();
    create_config_file(&project, "[vm]\nmax_frames = 20\nglobals_size = 2000\n");

    std::env::set_var("MONKEY_GLOBALS_SIZE", "3000");
    let result = ConfigLoader::with_global_config(&global).load_from_directory(&project);
    std::env::remove_var("MONKEY_GLOBALS_SIZE");

    let loaded = result.unwrap();
    assert_eq!(
        loaded.config.vm,
        VmConfig {
            stack_size: 100,
            max_frames: 20,
            globals_size: 3000,
        }
    );
    assert_eq!(loaded.sources.len(), 2);
}

#[test]
#[serial]
fn test_env_history_file() {
    let temp_dir = TempDir::new().unwrap();
    let history = temp_dir.path().join("hist");

    std::env::set_var("MONKEY_HISTORY_FILE", &history);
    let result = loader_without_global(&temp_dir).load_from_directory(temp_dir.path());
    std::env::remove_var("MONKEY_HISTORY_FILE");

    let loaded = result.unwrap();
    assert_eq!(loaded.config.repl.history_path(), Some(history));
}
