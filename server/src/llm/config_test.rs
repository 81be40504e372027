use super::*;
use std::collections::HashMap;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_to_openai() {
    let cfg = LlmConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
    assert_eq!(cfg.provider, LlmProviderKind::OpenAi);
    assert_eq!(cfg.api_key_env, "OPENAI_API_KEY");
    assert_eq!(cfg.api_key(), Some("sk-test"));
    assert_eq!(cfg.base_url, DEFAULT_OPENAI_BASE_URL);
    assert_eq!(cfg.max_tokens, DEFAULT_LLM_MAX_TOKENS);
    assert_eq!(
        cfg.timeouts,
        LlmTimeouts { request_secs: DEFAULT_LLM_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_LLM_CONNECT_TIMEOUT_SECS }
    );
}

#[test]
fn missing_key_is_not_a_startup_error() {
    let cfg = LlmConfig::from_lookup(lookup_from(&[])).unwrap();
    assert_eq!(cfg.api_key(), None);
}

#[test]
fn blank_key_counts_as_missing() {
    let cfg = LlmConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "  ")])).unwrap();
    assert_eq!(cfg.api_key(), None);
}

#[test]
fn parses_anthropic_overrides() {
    let cfg = LlmConfig::from_lookup(lookup_from(&[
        ("LLM_PROVIDER", "anthropic"),
        ("LLM_API_KEY_ENV", "MY_KEY"),
        ("MY_KEY", "ak-test"),
        ("LLM_BASE_URL", "https://example.test/v1/"),
        ("LLM_MAX_TOKENS", "512"),
        ("LLM_REQUEST_TIMEOUT_SECS", "42"),
        ("LLM_CONNECT_TIMEOUT_SECS", "7"),
    ]))
    .unwrap();
    assert_eq!(cfg.provider, LlmProviderKind::Anthropic);
    assert_eq!(cfg.api_key(), Some("ak-test"));
    assert_eq!(cfg.base_url, "https://example.test/v1");
    assert_eq!(cfg.max_tokens, 512);
    assert_eq!(cfg.timeouts, LlmTimeouts { request_secs: 42, connect_secs: 7 });
}

#[test]
fn anthropic_uses_its_own_default_key_var() {
    let cfg = LlmConfig::from_lookup(lookup_from(&[
        ("LLM_PROVIDER", "anthropic"),
        ("OPENAI_API_KEY", "sk-wrong"),
    ]))
    .unwrap();
    assert_eq!(cfg.api_key_env, "ANTHROPIC_API_KEY");
    assert_eq!(cfg.api_key(), None);
    assert_eq!(cfg.base_url, DEFAULT_ANTHROPIC_BASE_URL);
}

#[test]
fn unparseable_numbers_fall_back_to_defaults() {
    let cfg = LlmConfig::from_lookup(lookup_from(&[("LLM_MAX_TOKENS", "lots")])).unwrap();
    assert_eq!(cfg.max_tokens, DEFAULT_LLM_MAX_TOKENS);
}

#[test]
fn unknown_provider_errors() {
    let err = LlmConfig::from_lookup(lookup_from(&[("LLM_PROVIDER", "bad")]))
        .unwrap_err()
        .to_string();
    assert!(err.contains("unknown LLM_PROVIDER"));
}

#[test]
fn display_names() {
    assert_eq!(LlmProviderKind::OpenAi.display_name(), "OpenAI");
    assert_eq!(LlmProviderKind::Anthropic.display_name(), "Anthropic");
}
