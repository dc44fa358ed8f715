mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, Search, Service, SourceConfig};

use std::{collections::BTreeSet, fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::Unreadable { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::MalformedToml { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Invalid {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.search.default_page_size == 0 {
		return Err(Error::Invalid {
			message: "search.default_page_size must be greater than zero.".to_string(),
		});
	}
	if cfg.search.default_page_size > cfg.search.max_page_size {
		return Err(Error::Invalid {
			message: "search.default_page_size must not exceed search.max_page_size.".to_string(),
		});
	}
	if cfg.search.timeout_ms == 0 {
		return Err(Error::Invalid {
			message: "search.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.search.max_fetch_window < cfg.search.max_page_size {
		return Err(Error::Invalid {
			message: "search.max_fetch_window must be at least search.max_page_size.".to_string(),
		});
	}
	if cfg.search.feedback_fetch_limit == 0 {
		return Err(Error::Invalid {
			message: "search.feedback_fetch_limit must be greater than zero.".to_string(),
		});
	}

	let mut seen = BTreeSet::new();

	for source in &cfg.sources {
		if !seen.insert(source.id) {
			return Err(Error::InvalidSource {
				id: source.id,
				message: "sources.id is declared more than once.".to_string(),
			});
		}
		if source.name.trim().is_empty() {
			return Err(Error::InvalidSource {
				id: source.id,
				message: "sources.name must be non-empty.".to_string(),
			});
		}
		if source.timeout_ms == 0 {
			return Err(Error::InvalidSource {
				id: source.id,
				message: "sources.timeout_ms must be greater than zero.".to_string(),
			});
		}

		if let Some(endpoint) = source.endpoint.as_deref()
			&& !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
		{
			return Err(Error::InvalidSource {
				id: source.id,
				message: "sources.endpoint must be an http(s) URL.".to_string(),
			});
		}

		for (key, value) in &source.default_headers {
			if !value.is_string() {
				return Err(Error::InvalidSource {
					id: source.id,
					message: format!("sources.default_headers.{key} must be a string."),
				});
			}
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for source in &mut cfg.sources {
		if source.endpoint.as_deref().map(|endpoint| endpoint.trim().is_empty()).unwrap_or(false) {
			source.endpoint = None;
		}
		if source.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
			source.api_key = None;
		}
	}
}
