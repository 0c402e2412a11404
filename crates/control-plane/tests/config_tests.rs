use control_plane::{
    ConfigError, CoreConfig, CoreConfigOverrides, CorsConfig, SecurityOverrides, ServiceOverride,
    SystemConfigLoader, KNOWN_SERVICES,
};

#[test]
fn defaults_seed_every_known_service_disabled() {
    let config = CoreConfig::default();
    assert_eq!(config.services.len(), KNOWN_SERVICES.len());
    assert!(config.services.values().all(|service| !service.enabled));
    assert_eq!(config.services["storage"].domain, "storage.chitty.cc");
    assert!(!config.ai.enabled);
    assert_eq!(config.ai.models, vec!["claude-3-5-sonnet-20241022".to_string()]);
    assert!(config.security.rate_limit.enabled);
    assert_eq!(config.security.rate_limit.requests, 100);
    assert_eq!(config.security.rate_limit.window_ms, 60_000);
}

#[test]
fn services_iterate_alphabetically() {
    let config = CoreConfig::default();
    let names: Vec<&str> = config.services.keys().map(String::as_str).collect();
    let mut sorted = KNOWN_SERVICES.to_vec();
    sorted.sort_unstable();
    assert_eq!(names, sorted);
    assert_eq!(names.first(), Some(&"analytics"));
}

#[test]
fn service_overrides_merge_per_name() {
    let mut overrides = CoreConfigOverrides::default();
    overrides.services.insert(
        "storage".to_string(),
        ServiceOverride {
            enabled: true,
            domain: None,
        },
    );
    overrides.services.insert(
        "ledger".to_string(),
        ServiceOverride {
            enabled: true,
            domain: Some("ledger.example".to_string()),
        },
    );
    let config = CoreConfig::resolve(overrides);

    assert!(config.services["storage"].enabled);
    assert_eq!(config.services["storage"].domain, "storage.chitty.cc");
    assert!(!config.services["email"].enabled);
    assert_eq!(config.services["ledger"].domain, "ledger.example");
    let enabled: Vec<&str> = config.enabled_services().map(|(name, _)| name).collect();
    assert_eq!(enabled, vec!["ledger", "storage"]);
}

#[test]
fn security_sub_tables_replace_whole() {
    let overrides = CoreConfigOverrides {
        security: Some(SecurityOverrides {
            cors: Some(CorsConfig {
                origins: vec!["https://trace.example".to_string()],
                ..CorsConfig::default()
            }),
            rate_limit: None,
        }),
        ..CoreConfigOverrides::default()
    };
    let config = CoreConfig::resolve(overrides);
    assert_eq!(config.security.cors.origins, vec!["https://trace.example".to_string()]);
    assert_eq!(config.security.cors.headers.len(), 2);
    assert!(config.security.rate_limit.enabled);
}

#[test]
fn config_loader_reads_all_sections() {
    let input = r#"
[server]
name = "Trace"
version = "2.0.0"

[upstream]
base_url = "http://localhost:9999"
timeout_ms = 500

[services.analytics]
enabled = true

[services.storage]
enabled = true
domain = "kv.internal"

[ai]
enabled = true
vectorize = { enabled = true }

[security.rate_limit]
enabled = true
requests = 2
window_ms = 1000
"#;
    let config = SystemConfigLoader::from_str(input).expect("config");
    assert_eq!(config.server.name, "Trace");
    assert_eq!(config.server.environment, "production");
    assert_eq!(config.upstream.base_url, "http://localhost:9999");
    assert_eq!(config.upstream.max_tokens, 4096);
    assert!(config.core.services["analytics"].enabled);
    assert_eq!(config.core.services["storage"].domain, "kv.internal");
    assert!(config.core.vectorize_enabled());
    assert_eq!(config.core.ai.models.len(), 1);
    assert_eq!(config.core.security.rate_limit.requests, 2);
    assert_eq!(config.core.security.cors.origins, vec!["*".to_string()]);
}

#[test]
fn config_loader_accepts_camel_case_rate_limit() {
    let input = r#"
[security.rateLimit]
enabled = false
requests = 5
windowMs = 10
"#;
    let config = SystemConfigLoader::from_str(input).expect("config");
    assert!(!config.core.security.rate_limit.enabled);
    assert_eq!(config.core.security.rate_limit.window_ms, 10);
}

#[test]
fn config_loader_rejects_unknown_section() {
    let input = r#"
unknown = { value = "x" }
"#;
    let err = SystemConfigLoader::from_str(input).expect_err("error");
    match err {
        ConfigError::Parse(message) => assert!(message.contains("unknown")),
        _ => panic!("expected parse error"),
    }
}

#[test]
fn config_loader_rejects_type_mismatch() {
    let input = r#"
security = { rate_limit = { requests = "many" } }
"#;
    assert!(matches!(
        SystemConfigLoader::from_str(input),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn empty_input_yields_defaults() {
    let config = SystemConfigLoader::from_str("").expect("config");
    assert_eq!(config.core, CoreConfig::default());
}
