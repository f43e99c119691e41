use std::fs::File;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::catalog::Endpoints;

pub fn load<P: AsRef<Path>>(config_path: P) -> Arc<Config> {
    let config_path = config_path.as_ref();
    let reader = File::open(config_path).unwrap_or_else(|err| {
        panic!("Failed to open {}: {}", config_path.display(), err);
    });
    let config: Config = serde_yaml::from_reader(reader).unwrap_or_else(|err| {
        panic!("Failed to parse {}: {}", config_path.display(), err);
    });
    config.validate();
    Arc::new(config)
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
}

impl Config {
    pub fn validate(&self) {
        self.catalog.validate();
        self.search.validate();
        self.schedule.validate();
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    #[serde(default = "CatalogConfig::default_base_url")]
    pub base_url: Url,
    // No timeout unless specified.
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl CatalogConfig {
    fn default_base_url() -> Url {
        // The literal is a valid URL.
        Url::parse("https://api.tvmaze.com").unwrap()
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(self.base_url.clone())
    }

    fn validate(&self) {
        assert!(
            matches!(self.base_url.scheme(), "http" | "https"),
            "config.catalog: `base-url` must be an http or https URL"
        );
        if let Some(timeout) = self.timeout {
            assert!(
                !timeout.is_zero(),
                "config.catalog: `timeout` must be larger than 0"
            );
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            base_url: Self::default_base_url(),
            timeout: None,
            user_agent: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    #[serde(default = "SearchConfig::default_debounce", with = "humantime_serde")]
    pub debounce: Duration,
    #[serde(default = "SearchConfig::default_min_chars")]
    pub min_chars: usize,
}

impl SearchConfig {
    fn default_debounce() -> Duration {
        Duration::from_millis(300)
    }

    fn default_min_chars() -> usize {
        1
    }

    fn validate(&self) {
        assert!(
            !self.debounce.is_zero(),
            "config.search: `debounce` must be larger than 0"
        );
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            debounce: Self::default_debounce(),
            min_chars: Self::default_min_chars(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    #[serde(default = "ScheduleConfig::default_country")]
    pub country: String,
}

impl ScheduleConfig {
    fn default_country() -> String {
        "US".to_string()
    }

    fn validate(&self) {
        assert!(
            is_country_code(&self.country),
            "config.schedule: `country` must be an ISO 3166-1 alpha-2 code"
        );
    }
}

/// Returns `true` if `code` looks like an ISO 3166-1 alpha-2 code.
pub fn is_country_code(code: &str) -> bool {
    code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic())
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            country: Self::default_country(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}
