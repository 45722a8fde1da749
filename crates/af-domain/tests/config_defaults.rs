use af_domain::config::Config;

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
}

#[test]
fn explicit_zero_host_parses() {
    let toml_str = r#"
[server]
host = "0.0.0.0"
port = 3210
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
}

#[test]
fn default_cache_and_generation_caps_match_spec() {
    let config = Config::default();
    assert_eq!(config.cache.max_handles, 8);
    assert_eq!(config.cache.idle_secs, 1200);
    assert_eq!(config.generation.task_caps.summarize_short, 56);
    assert_eq!(config.generation.task_caps.summarize_long, 128);
}

#[test]
fn validate_reports_no_errors_on_defaults() {
    let config = Config::default();
    let errors: Vec<_> = config
        .validate()
        .into_iter()
        .filter(|i| matches!(i.severity, af_domain::config::ConfigSeverity::Error))
        .collect();
    assert!(errors.is_empty());
}
