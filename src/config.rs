//! Registry configuration
//!
//! Uses `figment` for layered configuration: defaults -> TOML file -> environment.
//! Environment variables are prefixed with `TRUENO_REGISTRY_`
//! (e.g. `TRUENO_REGISTRY_PAGE_SIZE=50`, `TRUENO_REGISTRY_ORDER_BY=CREATE_TIME`).

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cursor::{ListOptions, OrderBy, SortOrder, DEFAULT_PAGE_SIZE};
use crate::Result;

/// Environment variable prefix for registry settings.
pub const ENV_PREFIX: &str = "TRUENO_REGISTRY_";

/// Defaults applied to listings opened without explicit options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Items per page fetched by cursors (0 = unpaged)
    pub page_size: usize,
    /// Default ordering field
    pub order_by: OrderBy,
    /// Default ordering direction
    pub sort_order: SortOrder,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            order_by: OrderBy::Id,
            sort_order: SortOrder::Asc,
        }
    }
}

impl RegistryConfig {
    /// Load configuration from layered sources.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (prefixed with `TRUENO_REGISTRY_`)
    /// 2. TOML file at `path`, if given and present
    /// 3. Built-in defaults
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a source is malformed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX));
        Ok(figment.extract()?)
    }

    /// Listing options built from these defaults.
    #[must_use]
    pub fn list_options(&self) -> ListOptions {
        ListOptions::default()
            .with_page_size(self.page_size)
            .with_order_by(self.order_by)
            .with_sort_order(self.sort_order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let config = RegistryConfig::default();
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.list_options().order_by, OrderBy::Id);
    }

    #[test]
    fn test_file_then_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "registry.toml",
                r#"
                    page_size = 10
                    order_by = "CREATE_TIME"
                "#,
            )?;
            jail.set_env("TRUENO_REGISTRY_PAGE_SIZE", "25");

            let config = RegistryConfig::load(Some(Path::new("registry.toml")))
                .map_err(|e| figment::Error::from(e.to_string()))?;

            assert_eq!(config.page_size, 25);
            assert_eq!(config.order_by, OrderBy::CreateTime);
            assert_eq!(config.sort_order, SortOrder::Asc);
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        Jail::expect_with(|_jail| {
            let config = RegistryConfig::load(Some(Path::new("absent.toml")))
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config, RegistryConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_malformed_value_is_config_error() {
        Jail::expect_with(|jail| {
            jail.set_env("TRUENO_REGISTRY_ORDER_BY", "SIDEWAYS");
            let err = RegistryConfig::load(None).unwrap_err();
            assert!(matches!(err, crate::Error::Config(_)));
            Ok(())
        });
    }
}
