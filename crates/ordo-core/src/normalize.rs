//! Object name normalization.
//!
//! Case-insensitive platforms fold identifiers before comparing them; the
//! normalizer is applied to every name the orderer indexes or looks up.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::Error;

/// Folds object names the way the target platform compares them.
#[derive(Clone, Default)]
pub enum NameNormalizer {
    /// Names compare exactly.
    #[default]
    Preserve,
    /// Names are upper-cased.
    UpperCase,
    /// Names are lower-cased.
    LowerCase,
    /// Platform-specific folding.
    Custom(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

impl NameNormalizer {
    /// Wraps a platform-specific folding function.
    pub fn custom<F>(normalize: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(normalize))
    }

    /// Normalizes a name.
    #[must_use]
    pub fn normalize(&self, name: &str) -> String {
        match self {
            Self::Preserve => name.to_string(),
            Self::UpperCase => name.to_uppercase(),
            Self::LowerCase => name.to_lowercase(),
            Self::Custom(normalize) => normalize(name),
        }
    }
}

impl fmt::Debug for NameNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preserve => f.write_str("Preserve"),
            Self::UpperCase => f.write_str("UpperCase"),
            Self::LowerCase => f.write_str("LowerCase"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl FromStr for NameNormalizer {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "preserve" => Ok(Self::Preserve),
            "upper" => Ok(Self::UpperCase),
            "lower" => Ok(Self::LowerCase),
            other => Err(Error::configuration(format!(
                "name case must be one of preserve, upper, lower; got '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_case() {
        assert_eq!(NameNormalizer::Preserve.normalize("MyTab"), "MyTab");
        assert_eq!(NameNormalizer::UpperCase.normalize("MyTab"), "MYTAB");
        assert_eq!(NameNormalizer::LowerCase.normalize("MyTab"), "mytab");
    }

    #[test]
    fn custom_normalizer_is_applied() {
        let strip_quotes = NameNormalizer::custom(|name| name.trim_matches('"').to_uppercase());
        assert_eq!(strip_quotes.normalize("\"orders\""), "ORDERS");
        assert_eq!(format!("{strip_quotes:?}"), "Custom(..)");
    }

    #[test]
    fn parses_from_config_values() -> crate::Result<()> {
        assert!(matches!("UPPER".parse::<NameNormalizer>()?, NameNormalizer::UpperCase));
        assert!(matches!(" lower ".parse::<NameNormalizer>()?, NameNormalizer::LowerCase));
        assert!("title".parse::<NameNormalizer>().is_err());
        Ok(())
    }
}
