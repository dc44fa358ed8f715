use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use agentfed_config::{Config, Error};
use agentfed_domain::{PredicateKind, SourceId};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_value() -> Value {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.")
}

fn sample_toml_with_search(key: &str, value: Value) -> String {
	let mut root = sample_value();
	let search = root
		.as_table_mut()
		.and_then(|table| table.get_mut("search"))
		.and_then(Value::as_table_mut)
		.expect("Template config must include [search].");

	search.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render template config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("agentfed_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_payload(payload: String) -> agentfed_config::Result<Config> {
	let path = write_temp_config(payload);
	let result = agentfed_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn base_config() -> Config {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse test config.")
}

#[test]
fn sample_config_loads_and_normalizes_blank_values() {
	let cfg =
		load_payload(SAMPLE_CONFIG_TEMPLATE_TOML.to_string()).expect("Expected valid config.");
	let amoy = cfg.source(SourceId(80002)).expect("Missing polygon-amoy source.");

	assert_eq!(cfg.sources.len(), 3);
	assert!(amoy.endpoint.is_none());
	assert!(amoy.api_key.is_none());
}

#[test]
fn pushdown_defaults_when_omitted() {
	let cfg = base_config();
	let base = cfg.source(SourceId(84532)).expect("Missing base-sepolia source.");
	let caps = base.capabilities();

	assert_eq!(base.timeout_ms, 10_000);
	assert!(caps.supports(PredicateKind::Exact));
	assert!(caps.supports(PredicateKind::SetMembership));
	assert!(!caps.supports(PredicateKind::Substring));
	assert!(!caps.supports(PredicateKind::ArrayContainsAny));
}

#[test]
fn default_page_size_must_be_positive() {
	let err = load_payload(sample_toml_with_search("default_page_size", Value::Integer(0)))
		.expect_err("Expected page size validation error.");

	assert!(
		err.to_string().contains("search.default_page_size must be greater than zero."),
		"Unexpected error: {err}"
	);
}

#[test]
fn default_page_size_must_not_exceed_max() {
	let err = load_payload(sample_toml_with_search("default_page_size", Value::Integer(501)))
		.expect_err("Expected page size validation error.");

	assert!(
		err.to_string().contains("search.default_page_size must not exceed search.max_page_size."),
		"Unexpected error: {err}"
	);
}

#[test]
fn fetch_window_must_cover_a_full_page() {
	let mut cfg = base_config();

	cfg.search.max_fetch_window = 100;

	let err = agentfed_config::validate(&cfg).expect_err("Expected fetch window error.");

	assert!(err.to_string().contains("search.max_fetch_window"), "Unexpected error: {err}");
}

#[test]
fn duplicate_source_ids_are_rejected() {
	let mut cfg = base_config();
	let duplicate = cfg.sources[0].clone();

	cfg.sources.push(duplicate);

	let err = agentfed_config::validate(&cfg).expect_err("Expected duplicate source error.");

	assert!(
		matches!(err, Error::InvalidSource { id: SourceId(11155111), .. }),
		"Unexpected error: {err}"
	);
	assert_eq!(
		err.to_string(),
		"Invalid agentfed config for source 11155111: sources.id is declared more than once."
	);
}

#[test]
fn endpoints_must_be_http_urls() {
	let mut cfg = base_config();

	cfg.sources[0].endpoint = Some("ftp://indexer.example".to_string());

	let err = agentfed_config::validate(&cfg).expect_err("Expected endpoint validation error.");

	assert!(err.to_string().contains("sources.endpoint"), "Unexpected error: {err}");
}

#[test]
fn unknown_pushdown_kind_fails_to_parse() {
	let payload = SAMPLE_CONFIG_TEMPLATE_TOML.replace("\"set_membership\"]", "\"regex\"]");
	let err = load_payload(payload).expect_err("Expected parse error.");

	assert!(matches!(err, Error::MalformedToml { .. }), "Unexpected error: {err}");
}

#[test]
fn missing_file_reports_path() {
	let path = env::temp_dir().join("agentfed_config_test_missing.toml");
	let err = agentfed_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, Error::Unreadable { .. }), "Unexpected error: {err}");
	assert!(
		err.to_string().contains("agentfed_config_test_missing.toml"),
		"Unexpected error: {err}"
	);
}
