use super::*;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.ollama.protocol, "http");
    assert_eq!(config.ollama.host, "localhost");
    assert_eq!(config.ollama.port, 11434);
    assert_eq!(config.ollama.model, "all-minilm");
    assert_eq!(config.ollama.batch_size, 16);
    assert_eq!(config.ollama.embedding_dimension, 384);
    assert_eq!(config.llm.api_key_env, "API_KEY");
    assert_eq!(config.chunking.chunk_size, 1000);
    assert_eq!(config.chunking.chunk_overlap, 200);
    assert_eq!(config.retrieval.k, 5);
    assert_eq!(config.retrieval.collection_name, "papers");
    assert!(!config.pubmed.save_papers);
    assert!(!config.indexing.skip_unreadable);
    assert!(config.validate().is_ok());
}

#[test]
fn config_validation() {
    let config = Config::default();

    let mut invalid_config = config.clone();
    invalid_config.ollama.protocol = "ftp".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.batch_size = 1001;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.llm.base_url = "not a url".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.llm.api_key_env = "HAS SPACE".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.chunking.chunk_overlap = invalid_config.chunking.chunk_size;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::OverlapTooLarge(1000, 1000))
    ));

    let mut invalid_config = config.clone();
    invalid_config.retrieval.k = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.retrieval.collection_name = "../escape".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config;
    invalid_config.pubmed.timeout_secs = 0;
    assert!(invalid_config.validate().is_err());
}

#[test]
fn ollama_url_generation() {
    let config = OllamaConfig::default();
    let url = config
        .ollama_url()
        .expect("should generate ollama_url successfully");
    assert_eq!(url.as_str(), "http://localhost:11434/");
}

#[test]
fn https_url_generation() {
    let config = OllamaConfig {
        protocol: "https".to_string(),
        host: "secure.example.com".to_string(),
        port: 443,
        ..OllamaConfig::default()
    };

    let url = config
        .ollama_url()
        .expect("should generate https url successfully");
    assert_eq!(url.as_str(), "https://secure.example.com/");
}

#[test]
fn toml_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
    assert!(!toml_str.contains("separators"));
}

#[test]
fn partial_toml_uses_defaults() {
    let parsed: Config = toml::from_str("[retrieval]\nk = 8\n\n[ollama]\nport = 9999\n")
        .expect("should parse partial toml");
    assert_eq!(parsed.retrieval.k, 8);
    assert_eq!(parsed.retrieval.collection_name, "papers");
    assert_eq!(parsed.ollama.port, 9999);
    assert_eq!(parsed.ollama.model, "all-minilm");
    assert_eq!(parsed.llm, LlmConfig::default());
}

#[test]
fn setter_validation() {
    let mut config = OllamaConfig::default();

    assert!(config.set_protocol("https".to_string()).is_ok());
    assert!(config.set_host("example.com".to_string()).is_ok());
    assert!(config.set_port(8080).is_ok());
    assert!(config.set_model("new-model".to_string()).is_ok());
    assert!(config.set_batch_size(128).is_ok());
    assert!(config.set_embedding_dimension(768).is_ok());

    assert!(config.set_protocol("HTTP".to_string()).is_err());
    assert!(config.set_port(0).is_err());
    assert!(config.set_model(String::new()).is_err());
    assert!(config.set_batch_size(0).is_err());
    assert!(config.set_embedding_dimension(8).is_err());

    let mut llm = LlmConfig::default();
    assert!(llm.set_base_url("http://localhost:8080/v1".to_string()).is_ok());
    assert!(llm.set_base_url("ftp://example.com".to_string()).is_err());
    assert!(llm.set_timeout_secs(0).is_err());
    assert!(llm.set_model("  ".to_string()).is_err());

    let mut retrieval = RetrievalConfig::default();
    assert!(retrieval.set_k(10).is_ok());
    assert!(retrieval.set_k(0).is_err());
}

#[test]
fn chunking_setter_keeps_overlap_below_size() {
    let mut config = Config::default();
    assert!(config.set_chunking(500, 499).is_ok());
    assert!(matches!(
        config.set_chunking(500, 500),
        Err(ConfigError::OverlapTooLarge(500, 500))
    ));
    assert!(matches!(
        config.set_chunking(40, 10),
        Err(ConfigError::InvalidChunkSize(40))
    ));
    assert_eq!(config.chunking.chunk_size, 500);
    assert_eq!(config.chunking.chunk_overlap, 499);
}

#[test]
fn chunk_size_below_current_overlap_is_accepted_with_new_overlap() {
    let mut config = Config::default();
    assert_eq!(config.chunking.chunk_overlap, 200);

    config
        .set_chunking(150, 50)
        .expect("size and overlap should validate together");
    assert_eq!(config.chunking.chunk_size, 150);
    assert_eq!(config.chunking.chunk_overlap, 50);
    assert!(config.validate().is_ok());
}

#[test]
fn load_missing_config() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config::load(temp_dir.path()).expect("missing file should load defaults");

    assert_eq!(config.base_dir(), temp_dir.path());
    assert_eq!(config.ollama, OllamaConfig::default());
    assert_eq!(config.projects_dir(), temp_dir.path().join("projects"));
}

#[test]
fn save_and_reload() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config {
        base_dir: temp_dir.path().join("nested"),
        ..Config::default()
    };
    config.retrieval.k = 12;
    config.pubmed.save_papers = true;
    config.save().expect("should save config");

    assert!(config.config_file_path().exists());
    let reloaded = Config::load(temp_dir.path().join("nested")).expect("should reload");
    assert_eq!(reloaded, config);
}

#[test]
fn invalid_file_fails_to_load() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    std::fs::write(
        temp_dir.path().join("config.toml"),
        "[chunking]\nchunk_size = 100\nchunk_overlap = 150\n",
    )
    .expect("should write config");

    assert!(Config::load(temp_dir.path()).is_err());
}
