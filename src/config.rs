use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub removal: RemovalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    pub cache_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub default_page_size: usize,
    pub max_page_size: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemovalConfig {
    pub policy: RemovalPolicy,
}

/// What `remove_entity` does with non-empty sub-collections whose
/// relationship does not decide for itself
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalPolicy {
    #[default]
    Reject,
    Cascade,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self { cache_enabled: true }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            max_page_size: 500,
        }
    }
}

impl QueryConfig {
    /// Page size for a request, defaulted and clamped
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_size)
            .min(self.max_page_size)
    }
}

impl AdminConfig {
    /// Load configuration from defaults, an optional `admin` config file and
    /// `ADMIN_` prefixed environment variables
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Config::try_from(&AdminConfig::default())?)
            .add_source(config::File::with_name("admin").required(false))
            .add_source(
                config::Environment::with_prefix("ADMIN")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let admin_config: AdminConfig = config.try_deserialize()?;
        log::debug!("Loaded admin configuration: {:?}", admin_config);
        Ok(admin_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AdminConfig::default();
        assert!(config.metadata.cache_enabled);
        assert_eq!(config.removal.policy, RemovalPolicy::Reject);
        assert_eq!(config.query.page_size(None), 50);
        assert_eq!(config.query.page_size(Some(10)), 10);
        assert_eq!(config.query.page_size(Some(10_000)), 500);
    }

    #[test]
    fn test_partial_config_from_json() {
        let json = r#"{"removal": {"policy": "cascade"}, "query": {"default_page_size": 20, "max_page_size": 100}}"#;
        let config: AdminConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.removal.policy, RemovalPolicy::Cascade);
        assert_eq!(config.query.page_size(Some(250)), 100);
        assert!(config.metadata.cache_enabled);
    }
}
