//! Platform configuration for the orderer.
//!
//! These settings describe how the target database compares names and
//! whether rerunnable objects must be dropped in dependency order.

use crate::error::{Error, Result};
use crate::normalize::NameNormalizer;

const ENV_NAME_CASE: &str = "ORDO_NAME_CASE";
const ENV_DROP_ORDER_REQUIRED: &str = "ORDO_DROP_ORDER_REQUIRED";

/// Platform behavior consulted while ordering changes.
#[derive(Debug, Clone, Default)]
pub struct PlatformConfig {
    /// Folds object names before they are compared.
    pub name_normalizer: NameNormalizer,
    /// Rerunnable objects must be dropped after everything that uses them.
    pub drop_order_required: bool,
}

impl PlatformConfig {
    /// Creates a configuration with the given normalizer.
    #[must_use]
    pub fn new(name_normalizer: NameNormalizer) -> Self {
        Self {
            name_normalizer,
            drop_order_required: false,
        }
    }

    /// Sets whether drops of rerunnable objects must follow dependencies.
    #[must_use]
    pub fn with_drop_order_required(mut self, required: bool) -> Self {
        self.drop_order_required = required;
        self
    }

    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a value is present but invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Loads configuration with a custom environment source.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a value is present but invalid.
    pub fn from_env_with<F>(get_env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let name_normalizer = match get_env(ENV_NAME_CASE) {
            Some(raw) => raw.parse::<NameNormalizer>().map_err(|_| {
                Error::configuration(format!(
                    "{ENV_NAME_CASE} must be one of preserve, upper, lower; got '{raw}'"
                ))
            })?,
            None => NameNormalizer::default(),
        };
        let drop_order_required = parse_bool_env(&get_env, ENV_DROP_ORDER_REQUIRED, false)?;

        Ok(Self {
            name_normalizer,
            drop_order_required,
        })
    }
}

fn parse_bool_env<F>(get_env: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = get_env(key) else {
        return Ok(default);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(Error::configuration(format!(
            "{key} must be true, false, 1 or 0; got '{raw}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() -> Result<()> {
        let config = PlatformConfig::from_env_with(env(&[]))?;
        assert!(matches!(config.name_normalizer, NameNormalizer::Preserve));
        assert!(!config.drop_order_required);
        Ok(())
    }

    #[test]
    fn reads_case_and_drop_order() -> Result<()> {
        let config = PlatformConfig::from_env_with(env(&[
            (ENV_NAME_CASE, "upper"),
            (ENV_DROP_ORDER_REQUIRED, "1"),
        ]))?;
        assert_eq!(config.name_normalizer.normalize("orders"), "ORDERS");
        assert!(config.drop_order_required);
        Ok(())
    }

    #[test]
    fn rejects_invalid_name_case() {
        let err = PlatformConfig::from_env_with(env(&[(ENV_NAME_CASE, "camel")]))
            .expect_err("invalid case should fail");
        assert!(err.to_string().contains(ENV_NAME_CASE));
    }

    #[test]
    fn rejects_invalid_drop_order_flag() {
        let err = PlatformConfig::from_env_with(env(&[(ENV_DROP_ORDER_REQUIRED, "yes")]))
            .expect_err("invalid flag should fail");
        assert!(matches!(err, Error::Configuration { .. }));
    }
}
