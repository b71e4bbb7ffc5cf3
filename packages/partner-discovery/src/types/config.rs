//! Per-mode discovery configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How hard a discovery run should look.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMode {
    #[default]
    Standard,
    Aggressive,
}

impl DiscoveryMode {
    /// Parse a mode name. Anything other than `aggressive` is `Standard`.
    pub fn from_str_lossy(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("aggressive") {
            DiscoveryMode::Aggressive
        } else {
            DiscoveryMode::Standard
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveryMode::Standard => "standard",
            DiscoveryMode::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for DiscoveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds and limits for one discovery mode.
///
/// Loaded from the static table in [`DiscoveryConfig::for_mode`] and never
/// mutated while a run is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryConfig {
    /// Link depth passed to the mapping service
    pub max_depth: u32,

    /// Page limit passed to the mapping service
    pub max_pages: u32,

    /// Whether mapping may cross into subdomains of the seed
    pub include_subdomains: bool,

    /// Subdomain labels allowed into the shortlist when
    /// `include_subdomains` is on (empty = any subdomain of the root)
    #[serde(default)]
    pub allowed_subdomains: Vec<String>,

    /// Hard cap on the number of partners a run returns
    pub max_partners: usize,

    /// Below this many unique partners the next stage is tried
    pub agentic_threshold: usize,

    /// Most URLs the agentic fallback will visit
    pub agentic_max_directory_pages: usize,

    /// Upper bound on extraction attempts per agentic URL
    pub agentic_max_pagination_attempts: usize,

    /// How long a run's results stay in the cache
    #[serde(rename = "cacheTtlSecs", with = "duration_secs")]
    pub cache_ttl: Duration,
}

impl DiscoveryConfig {
    /// Static configuration for a mode.
    pub fn for_mode(mode: DiscoveryMode) -> Self {
        match mode {
            DiscoveryMode::Standard => Self {
                max_depth: 2,
                max_pages: 50,
                include_subdomains: false,
                allowed_subdomains: vec![],
                max_partners: 50,
                agentic_threshold: 8,
                agentic_max_directory_pages: 3,
                agentic_max_pagination_attempts: 1,
                cache_ttl: Duration::from_secs(6 * 60 * 60),
            },
            DiscoveryMode::Aggressive => Self {
                max_depth: 3,
                max_pages: 150,
                include_subdomains: true,
                allowed_subdomains: ["marketplace", "partners", "apps", "app"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                max_partners: 150,
                agentic_threshold: 15,
                agentic_max_directory_pages: 6,
                agentic_max_pagination_attempts: 3,
                cache_ttl: Duration::from_secs(24 * 60 * 60),
            },
        }
    }

    /// Set the partner cap.
    pub fn with_max_partners(mut self, max: usize) -> Self {
        self.max_partners = max;
        self
    }

    /// Set the agentic threshold.
    pub fn with_agentic_threshold(mut self, threshold: usize) -> Self {
        self.agentic_threshold = threshold;
        self
    }

    /// Set the agentic page budget.
    pub fn with_agentic_max_directory_pages(mut self, pages: usize) -> Self {
        self.agentic_max_directory_pages = pages;
        self
    }

    /// Set the cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Running-total cap for a single stage loop.
    pub fn stage_cap(&self) -> usize {
        STAGE_SOFT_CAP.min(self.max_partners)
    }
}

/// Stage loops stop issuing calls once this many partners are in hand.
pub const STAGE_SOFT_CAP: usize = 25;

/// The configuration table consulted by the orchestrator, one entry per mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfigs {
    standard: DiscoveryConfig,
    aggressive: DiscoveryConfig,
}

impl Default for DiscoveryConfigs {
    fn default() -> Self {
        Self {
            standard: DiscoveryConfig::for_mode(DiscoveryMode::Standard),
            aggressive: DiscoveryConfig::for_mode(DiscoveryMode::Aggressive),
        }
    }
}

impl DiscoveryConfigs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the configuration for one mode.
    pub fn with(mut self, mode: DiscoveryMode, config: DiscoveryConfig) -> Self {
        match mode {
            DiscoveryMode::Standard => self.standard = config,
            DiscoveryMode::Aggressive => self.aggressive = config,
        }
        self
    }

    pub fn get(&self, mode: DiscoveryMode) -> &DiscoveryConfig {
        match mode {
            DiscoveryMode::Standard => &self.standard,
            DiscoveryMode::Aggressive => &self.aggressive,
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing_is_lenient() {
        assert_eq!(DiscoveryMode::from_str_lossy("aggressive"), DiscoveryMode::Aggressive);
        assert_eq!(DiscoveryMode::from_str_lossy(" AGGRESSIVE "), DiscoveryMode::Aggressive);
        assert_eq!(DiscoveryMode::from_str_lossy("standard"), DiscoveryMode::Standard);
        assert_eq!(DiscoveryMode::from_str_lossy("turbo"), DiscoveryMode::Standard);
        assert_eq!(DiscoveryMode::from_str_lossy(""), DiscoveryMode::Standard);
    }

    #[test]
    fn test_aggressive_is_wider_than_standard() {
        let standard = DiscoveryConfig::for_mode(DiscoveryMode::Standard);
        let aggressive = DiscoveryConfig::for_mode(DiscoveryMode::Aggressive);
        assert!(aggressive.max_pages > standard.max_pages);
        assert!(aggressive.max_partners > standard.max_partners);
        assert!(aggressive.include_subdomains);
        assert!(!standard.include_subdomains);
    }

    #[test]
    fn test_stage_cap_is_min_of_soft_cap_and_max_partners() {
        let config = DiscoveryConfig::for_mode(DiscoveryMode::Standard);
        assert_eq!(config.stage_cap(), STAGE_SOFT_CAP);
        assert_eq!(config.with_max_partners(5).stage_cap(), 5);
    }

    #[test]
    fn test_config_table_override() {
        let custom = DiscoveryConfig::for_mode(DiscoveryMode::Standard).with_max_partners(3);
        let table = DiscoveryConfigs::new().with(DiscoveryMode::Standard, custom.clone());
        assert_eq!(table.get(DiscoveryMode::Standard), &custom);
        assert_eq!(
            table.get(DiscoveryMode::Aggressive),
            &DiscoveryConfig::for_mode(DiscoveryMode::Aggressive)
        );
    }

    #[test]
    fn test_config_serializes_ttl_as_seconds() {
        let config = DiscoveryConfig::for_mode(DiscoveryMode::Standard);
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["cacheTtlSecs"], 6 * 60 * 60);
        assert_eq!(value["agenticThreshold"], 8);
        let back: DiscoveryConfig = serde_json::from_value(value).unwrap();
        assert_eq!(back, config);
    }
}
