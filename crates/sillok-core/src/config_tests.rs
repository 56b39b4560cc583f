//! Tests for config module

#[cfg(test)]
mod tests {
    use crate::config::*;

    #[test]
    fn test_config_default_values() {
        let config = SillokConfig::default();

        assert_eq!(config.store.dir, "./store");
        assert!(!config.store.relax_context);
        assert_eq!(config.retrieval.top_k_final, 8);
        assert_eq!(config.retrieval.top_k_retrieve, 60);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_from_toml_minimal() {
        let toml = r#"
[store]
dir = "/data/sillok"
"#;

        let config = SillokConfig::from_toml(toml).expect("parse");

        assert_eq!(config.store.dir, "/data/sillok");
        // Other values should be defaults
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.retrieval.top_k_final, 8);
    }

    #[test]
    fn test_config_from_toml_full() {
        let toml = r#"
[store]
dir = "/data/sillok"
relax_context = true

[retrieval]
top_k_retrieve = 40
top_k_final = 5
pre_rerank_top_k = 32
max_query_expansions = 6
max_ctx_docs = 12

[server]
host = "127.0.0.1"
port = 9090

[logging]
level = "debug"
"#;

        let config = SillokConfig::from_toml(toml).expect("parse");

        assert_eq!(config.store.dir, "/data/sillok");
        assert!(config.store.relax_context);
        assert_eq!(config.retrieval.top_k_retrieve, 40);
        assert_eq!(config.retrieval.top_k_final, 5);
        assert_eq!(config.retrieval.pre_rerank_top_k, 32);
        assert_eq!(config.retrieval.max_query_expansions, 6);
        assert_eq!(config.retrieval.max_ctx_docs, 12);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_config_validate_success() {
        let config = SillokConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validate_empty_store_dir() {
        let mut config = SillokConfig::default();
        config.store.dir = "  ".to_string();

        let result = config.validate();

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("store.dir"));
    }

    #[test]
    fn test_config_validate_top_k_final_zero() {
        let mut config = SillokConfig::default();
        config.retrieval.top_k_final = 0;

        let result = config.validate();

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("retrieval.top_k_final"));
    }

    #[test]
    fn test_config_validate_retrieve_below_final() {
        let mut config = SillokConfig::default();
        config.retrieval.top_k_retrieve = 2;
        config.retrieval.top_k_final = 8;

        let result = config.validate();

        assert!(result.is_err());
    }

    #[test]
    fn test_config_validate_invalid_log_level() {
        let mut config = SillokConfig::default();
        config.logging.level = "verbose".to_string();

        let result = config.validate();

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("logging.level"));
    }

    #[test]
    fn test_config_to_toml_roundtrip() {
        let mut config = SillokConfig::default();
        config.server.port = 9000;
        config.retrieval.top_k_final = 5;

        let toml_str = config.to_toml().expect("serialize");
        let parsed = SillokConfig::from_toml(&toml_str).expect("parse");

        assert_eq!(parsed.server.port, 9000);
        assert_eq!(parsed.retrieval.top_k_final, 5);
    }
}
