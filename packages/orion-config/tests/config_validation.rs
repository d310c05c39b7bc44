use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use orion_config::{Config, Error, Feature};

const SAMPLE_CONFIG_TOML: &str = include_str!("fixtures/sample_config.toml");

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now().duration_since(UNIX_EPOCH).expect("System time is valid.").as_nanos();
	let suffix = COUNTER.fetch_add(1, Ordering::Relaxed);
	let mut path = env::temp_dir();

	path.push(format!("orion_config_test_{nanos}_{suffix}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn sample_with(section: &str, key: &str, value: Value) -> String {
	let mut root: Value = toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.");
	let mut table = root.as_table_mut().expect("Sample config must be a table.");

	for part in section.split('.') {
		table = table
			.get_mut(part)
			.and_then(Value::as_table_mut)
			.expect("Sample config must include the requested section.");
	}

	table.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render sample config.")
}

fn load_payload(payload: String) -> orion_config::Result<Config> {
	let path = write_temp_config(payload);
	let result = orion_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

#[test]
fn sample_config_loads() {
	let cfg = load_payload(SAMPLE_CONFIG_TOML.to_string()).expect("Sample config must load.");

	assert_eq!(cfg.storage.postgres.pool_max_conns, 8);
	assert_eq!(cfg.search.max_page_size, 1_000);
	assert_eq!(cfg.tiers.basic.max_forces, 6_000);
	assert!(cfg.tiers.pro.features.contains(&Feature::SignalAccess));
	assert_eq!(cfg.tiers.enterprise.max_projects, -1);
}

#[test]
fn omitted_sections_fall_back_to_defaults() {
	let payload = r#"
[service]
log_level = "debug"

[storage.postgres]
dsn = "postgres://localhost/orion"
pool_max_conns = 1
"#;
	let cfg = load_payload(payload.to_string()).expect("Minimal config must load.");

	assert_eq!(cfg.projects.default_project_name, "Shared Catalog");
	assert!(cfg.projects.repair_on_startup);
	assert_eq!(cfg.search.default_page_size, 50);
	assert_eq!(cfg.search.top_tags, 20);
	assert!(cfg.tiers.basic.features.is_empty());
	assert_eq!(cfg.tiers.enterprise.features.len(), Feature::ALL.len());
}

#[test]
fn rejects_page_size_above_hard_cap() {
	let payload = sample_with("search", "max_page_size", Value::Integer(5_000));
	let err = load_payload(payload).expect_err("Expected validation error.");

	match err {
		Error::Validation { message } => {
			assert!(message.contains("search.max_page_size"), "Unexpected message: {message}");
		},
		other => panic!("Unexpected error: {other:?}"),
	}
}

#[test]
fn rejects_default_page_size_above_max() {
	let payload = sample_with("search", "default_page_size", Value::Integer(2_000));

	assert!(matches!(load_payload(payload), Err(Error::Validation { .. })));
}

#[test]
fn rejects_ceiling_below_unlimited_marker() {
	let payload = sample_with("tiers.pro", "max_projects", Value::Integer(-2));
	let err = load_payload(payload).expect_err("Expected validation error.");

	assert!(err.to_string().contains("tiers.pro.max_projects"), "Unexpected error: {err}");
}

#[test]
fn rejects_unknown_feature_name() {
	let payload = sample_with(
		"tiers.basic",
		"features",
		Value::Array(vec![Value::String("time_travel".to_string())]),
	);

	assert!(matches!(load_payload(payload), Err(Error::ParseConfig { .. })));
}

#[test]
fn rejects_empty_dsn() {
	let payload = sample_with("storage.postgres", "dsn", Value::String("  ".to_string()));

	assert!(matches!(load_payload(payload), Err(Error::Validation { .. })));
}

#[test]
fn duplicate_features_are_collapsed() {
	let payload = sample_with(
		"tiers.basic",
		"features",
		Value::Array(vec![
			Value::String("report_export".to_string()),
			Value::String("report_export".to_string()),
		]),
	);
	let cfg = load_payload(payload).expect("Config must load.");

	assert_eq!(cfg.tiers.basic.features, vec![Feature::ReportExport]);
}
