mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Feature, Postgres, Projects, Search, Service, Storage, TierCapabilities, Tiers,
};

use std::{fs, path::Path};

pub const MAX_PAGE_SIZE_LIMIT: u32 = 1_000;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.projects.default_project_name.is_empty() {
		return Err(Error::Validation {
			message: "projects.default_project_name must be non-empty.".to_string(),
		});
	}
	if cfg.search.default_page_size == 0 {
		return Err(Error::Validation {
			message: "search.default_page_size must be greater than zero.".to_string(),
		});
	}
	if cfg.search.max_page_size > MAX_PAGE_SIZE_LIMIT {
		return Err(Error::Validation {
			message: format!("search.max_page_size must be {MAX_PAGE_SIZE_LIMIT} or less."),
		});
	}
	if cfg.search.default_page_size > cfg.search.max_page_size {
		return Err(Error::Validation {
			message: "search.default_page_size must not exceed search.max_page_size.".to_string(),
		});
	}
	if cfg.search.top_sources == 0 || cfg.search.top_tags == 0 {
		return Err(Error::Validation {
			message: "search.top_sources and search.top_tags must be greater than zero."
				.to_string(),
		});
	}

	for (label, caps) in
		[("basic", &cfg.tiers.basic), ("pro", &cfg.tiers.pro), ("enterprise", &cfg.tiers.enterprise)]
	{
		for (field, value) in [
			("max_projects", caps.max_projects),
			("max_forces", caps.max_forces),
			("max_ai_queries_per_month", caps.max_ai_queries_per_month),
		] {
			if value < -1 {
				return Err(Error::Validation {
					message: format!(
						"tiers.{label}.{field} must be -1 (unlimited) or zero or greater."
					),
				});
			}
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.projects.default_project_name = cfg.projects.default_project_name.trim().to_string();
	cfg.service.log_level = cfg.service.log_level.trim().to_string();

	for caps in [&mut cfg.tiers.basic, &mut cfg.tiers.pro, &mut cfg.tiers.enterprise] {
		caps.features.sort();
		caps.features.dedup();
	}
}
