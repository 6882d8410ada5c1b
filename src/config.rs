use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::codec::ColumnLayout;
use crate::routing::{PlanStrategy, PlannerConfig};
use crate::types::LocationKey;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub layout: LayoutConfig,
    pub planner: PlannerSettings,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            layout: LayoutConfig::from_env(),
            planner: PlannerSettings::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;

    fn from_env() -> Self {
        let host_value =
            env_string("SLOTTING_API_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                tracing::warn!(
                    value = %host_value,
                    error = %err,
                    "could not parse SLOTTING_API_HOST, using {}",
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match env_string("SLOTTING_API_PORT") {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    tracing::warn!(
                        "SLOTTING_API_PORT must not be 0, using {}",
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    tracing::warn!(
                        value = %raw,
                        error = %err,
                        "could not parse SLOTTING_API_PORT, using {}",
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host: effective_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }
}

/// Floor-plan layout used when mapping locations to sheet cells.
#[derive(Clone, Copy, Debug)]
pub struct LayoutConfig {
    columns: ColumnLayout,
}

impl LayoutConfig {
    const LAYOUT_VAR: &'static str = "SLOTTING_COLUMN_LAYOUT";
    const SPLIT_RACK_VAR: &'static str = "SLOTTING_SPLIT_RACK";

    fn from_env() -> Self {
        let split_rack = load_u32_with_warning(
            Self::SPLIT_RACK_VAR,
            ColumnLayout::DEFAULT_SPLIT_RACK,
            |value| value > 0,
            "must be greater than 0",
        );

        let columns = match env_string(Self::LAYOUT_VAR) {
            Some(raw) => parse_layout(&raw, split_rack).unwrap_or_else(|| {
                tracing::warn!(
                    value = %raw,
                    "{} must be 'simplified' or 'split', using split layout",
                    Self::LAYOUT_VAR
                );
                ColumnLayout::Split { split_rack }
            }),
            None => ColumnLayout::Split { split_rack },
        };

        Self { columns }
    }

    pub fn new(columns: ColumnLayout) -> Self {
        Self { columns }
    }

    pub fn column_layout(&self) -> ColumnLayout {
        self.columns
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self::new(ColumnLayout::default())
    }
}

/// Route planner settings.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlannerSettings {
    planner: PlannerConfig,
}

impl PlannerSettings {
    const PALLET_SIZE_VAR: &'static str = "SLOTTING_PALLET_SIZE";
    const REFERENCE_VAR: &'static str = "SLOTTING_REFERENCE_LOCATION";
    const STRICT_BUCKETS_VAR: &'static str = "SLOTTING_STRICT_PALLET_BUCKETS";
    const STRATEGY_VAR: &'static str = "SLOTTING_PLAN_STRATEGY";

    fn from_env() -> Self {
        let pallet_size = load_u32_with_warning(
            Self::PALLET_SIZE_VAR,
            PlannerConfig::DEFAULT_PALLET_SIZE,
            |value| value > 0,
            "must be greater than 0",
        );

        let reference = match env_string(Self::REFERENCE_VAR) {
            Some(raw) => match raw.parse::<LocationKey>() {
                Ok(key) => key,
                Err(err) => {
                    tracing::warn!(
                        value = %raw,
                        error = %err,
                        "could not parse {}, using {}",
                        Self::REFERENCE_VAR,
                        PlannerConfig::DEFAULT_REFERENCE
                    );
                    PlannerConfig::DEFAULT_REFERENCE
                }
            },
            None => PlannerConfig::DEFAULT_REFERENCE,
        };

        let strict = env_string(Self::STRICT_BUCKETS_VAR)
            .and_then(|raw| parse_bool(&raw, Self::STRICT_BUCKETS_VAR))
            .unwrap_or(PlannerConfig::DEFAULT_STRICT_PALLET_BUCKETS);
        if strict {
            tracing::warn!("strict pallet buckets enabled: oversized locations are never picked");
        }

        let strategy = match env_string(Self::STRATEGY_VAR) {
            Some(raw) => parse_strategy(&raw).unwrap_or_else(|| {
                tracing::warn!(
                    value = %raw,
                    "{} must be 'nearest', 'shelf_priority' or 'sequenced', using nearest",
                    Self::STRATEGY_VAR
                );
                PlanStrategy::Nearest
            }),
            None => PlanStrategy::default(),
        };

        let planner = PlannerConfig::builder()
            .pallet_size(pallet_size)
            .reference(reference)
            .strict_pallet_buckets(strict)
            .strategy(strategy)
            .build();

        Self { planner }
    }

    /// Returns the configured PlannerConfig.
    pub fn planner_config(&self) -> PlannerConfig {
        self.planner
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            tracing::warn!(var = name, error = %err, "environment access failed, using default");
            None
        }
    }
}

fn parse_layout(raw: &str, split_rack: u32) -> Option<ColumnLayout> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "simplified" | "simple" => Some(ColumnLayout::Simplified),
        "split" | "extended" => Some(ColumnLayout::Split { split_rack }),
        _ => None,
    }
}

fn parse_strategy(raw: &str) -> Option<PlanStrategy> {
    match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "nearest" => Some(PlanStrategy::Nearest),
        "shelf_priority" | "shelf" => Some(PlanStrategy::ShelfPriority),
        "sequenced" | "seq" => Some(PlanStrategy::Sequenced),
        _ => None,
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            tracing::warn!(
                var = var_name,
                value = other,
                "could not interpret value as boolean, using default"
            );
            None
        }
    }
}

fn load_u32_with_warning(
    var_name: &str,
    default: u32,
    validator: impl Fn(u32) -> bool,
    invalid_hint: &str,
) -> u32 {
    match env_string(var_name) {
        Some(raw) => match raw.parse::<u32>() {
            Ok(value) if validator(value) => {
                if value != default {
                    tracing::info!(var = var_name, value, "using non-default value");
                }
                value
            }
            Ok(_) => {
                tracing::warn!(
                    var = var_name,
                    value = %raw,
                    "invalid value ({invalid_hint}), using {default}"
                );
                default
            }
            Err(err) => {
                tracing::warn!(
                    var = var_name,
                    value = %raw,
                    error = %err,
                    "could not parse as number, using {default}"
                );
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_true_values() {
        assert_eq!(parse_bool("1", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("true", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("Yes", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool(" on ", "TEST_VAR"), Some(true));
    }

    #[test]
    fn test_parse_bool_false_values() {
        assert_eq!(parse_bool("0", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("FALSE", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool(" no ", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("off", "TEST_VAR"), Some(false));
    }

    #[test]
    fn test_parse_bool_invalid_values() {
        assert_eq!(parse_bool("maybe", "TEST_VAR"), None);
        assert_eq!(parse_bool("2", "TEST_VAR"), None);
        assert_eq!(parse_bool("", "TEST_VAR"), None);
    }

    #[test]
    fn test_parse_layout() {
        assert_eq!(parse_layout("Simplified", 51), Some(ColumnLayout::Simplified));
        assert_eq!(
            parse_layout("split", 40),
            Some(ColumnLayout::Split { split_rack: 40 })
        );
        assert_eq!(parse_layout("diagonal", 51), None);
    }

    #[test]
    fn test_parse_strategy() {
        assert_eq!(parse_strategy("Nearest"), Some(PlanStrategy::Nearest));
        assert_eq!(parse_strategy(" shelf-priority "), Some(PlanStrategy::ShelfPriority));
        assert_eq!(parse_strategy("seq"), Some(PlanStrategy::Sequenced));
        assert_eq!(parse_strategy("random"), None);
    }

    #[test]
    fn test_missing_variable_falls_back_to_default() {
        assert_eq!(
            load_u32_with_warning(
                "SLOTTING_TEST_SURELY_UNSET_VARIABLE",
                24,
                |v| v > 0,
                "must be greater than 0"
            ),
            24
        );
    }
}
