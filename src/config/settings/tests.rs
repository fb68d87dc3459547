use super::*;
use serial_test::serial;
use tempfile::TempDir;

fn config_in(dir: &TempDir) -> Config {
    Config::load(dir.path()).expect("should load config successfully")
}

#[test]
fn default_config() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config = config_in(&temp_dir);

    assert_eq!(config.gemini.api_key, None);
    assert_eq!(config.gemini.base_url, DEFAULT_API_BASE);
    assert_eq!(config.gemini.embedding_model, "embedding-001");
    assert_eq!(config.gemini.chat_model, "gemini-2.5-flash");
    assert_eq!(config.gemini.batch_size, 64);
    assert_eq!(config.gemini.embedding_dimension, DEFAULT_EMBEDDING_DIMENSION);
    assert_eq!(config.chunking.chunk_size, 2000);
    assert_eq!(config.chunking.chunk_overlap, 400);
    assert_eq!(config.chat.language, "English");
    assert_eq!(config.base_dir, temp_dir.path());
}

#[test]
fn config_validation() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config = config_in(&temp_dir);
    assert!(config.validate().is_ok());

    let mut invalid_config = config.clone();
    invalid_config.gemini.batch_size = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.gemini.batch_size = 101;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.gemini.embedding_model = String::new();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.gemini.base_url = "not a url".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.gemini.timeout_secs = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.gemini.embedding_dimension = 16;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.chunking.chunk_size = 100;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.chunking.chunk_overlap = invalid_config.chunking.chunk_size / 2;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config;
    invalid_config.chat.language = "  ".to_string();
    assert!(invalid_config.validate().is_err());
}

#[test]
fn toml_serialization() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config = config_in(&temp_dir);

    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let mut parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    parsed_config.base_dir = config.base_dir.clone();
    assert_eq!(config, parsed_config);
}

#[test]
fn save_and_reload() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let mut config = config_in(&temp_dir);
    config.gemini.api_key = Some("file-key".to_string());
    config.chat.language = "Turkish".to_string();

    config.save().expect("should save config successfully");
    assert!(config.config_file_path().exists());

    let reloaded = Config::load(temp_dir.path()).expect("should reload config successfully");
    assert_eq!(config, reloaded);
}

#[test]
fn partial_config_file_uses_defaults() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    std::fs::write(
        temp_dir.path().join("config.toml"),
        "[chat]\nlanguage = \"German\"\n",
    )
    .expect("should write config file");

    let config = Config::load(temp_dir.path()).expect("should load config successfully");
    assert_eq!(config.chat.language, "German");
    assert_eq!(config.gemini.embedding_model, "embedding-001");
    assert_eq!(config.chunking.chunk_size, 2000);
}

#[test]
fn store_path_is_under_base_dir() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config = config_in(&temp_dir);
    assert_eq!(config.store_path(), temp_dir.path().join("db"));
}

#[test]
fn api_url_generation() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config = config_in(&temp_dir);
    let url = config
        .gemini
        .api_url()
        .expect("should generate api url successfully");
    assert_eq!(url.as_str(), "https://generativelanguage.googleapis.com/");
}

#[test]
#[serial]
fn resolve_api_key_precedence() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let mut config = config_in(&temp_dir);
    config.gemini.api_key = Some("file-key".to_string());

    // SAFETY: test is serialized; nothing else touches the environment
    unsafe { std::env::set_var(API_KEY_ENV, "env-key") };

    let key = config
        .resolve_api_key(Some("cli-key"))
        .expect("override should resolve");
    assert_eq!(key, "cli-key");

    let key = config
        .resolve_api_key(None)
        .expect("environment key should resolve");
    assert_eq!(key, "env-key");

    // SAFETY: test is serialized; nothing else touches the environment
    unsafe { std::env::remove_var(API_KEY_ENV) };

    let key = config
        .resolve_api_key(None)
        .expect("config file key should resolve");
    assert_eq!(key, "file-key");
}

#[test]
#[serial]
fn resolve_api_key_missing() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config = config_in(&temp_dir);

    // SAFETY: test is serialized; nothing else touches the environment
    unsafe { std::env::remove_var(API_KEY_ENV) };

    assert!(matches!(
        config.resolve_api_key(None),
        Err(ConfigError::MissingApiKey)
    ));
}
