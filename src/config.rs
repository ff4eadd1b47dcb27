//! Normalizer configuration. Everything is passed explicitly; nothing global.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Decimal/thousands convention used for every textual amount. Fixed per
/// deployment, never guessed from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NumberFormat {
    /// `1,234.56`
    #[default]
    DotDecimal,
    /// `1.234,56`
    CommaDecimal,
}

impl NumberFormat {
    pub fn decimal_separator(self) -> char {
        match self {
            NumberFormat::DotDecimal => '.',
            NumberFormat::CommaDecimal => ',',
        }
    }

    pub fn thousands_separator(self) -> char {
        match self {
            NumberFormat::DotDecimal => ',',
            NumberFormat::CommaDecimal => '.',
        }
    }
}

impl std::str::FromStr for NumberFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dot" | "dot-decimal" | "en" => Ok(Self::DotDecimal),
            "comma" | "comma-decimal" | "eu" => Ok(Self::CommaDecimal),
            other => Err(ConfigError::UnknownNumberFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NormalizerConfig {
    pub number_format: NumberFormat,
    /// Used when neither the header nor the total's literal carries a currency.
    pub default_currency: Option<String>,
}

impl NormalizerConfig {
    pub const ENV_NUMBER_FORMAT: &'static str = "INVOICE_NUMBER_FORMAT";
    pub const ENV_DEFAULT_CURRENCY: &'static str = "INVOICE_DEFAULT_CURRENCY";

    /// Read configuration from the process environment, loading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup(Self::ENV_NUMBER_FORMAT).filter(|s| !s.trim().is_empty()) {
            config.number_format = raw.parse()?;
        }
        if let Some(raw) = lookup(Self::ENV_DEFAULT_CURRENCY).filter(|s| !s.trim().is_empty()) {
            config.default_currency = Some(validate_currency(&raw)?);
        }
        Ok(config)
    }

    pub fn with_number_format(mut self, number_format: NumberFormat) -> Self {
        self.number_format = number_format;
        self
    }

    pub fn with_default_currency(mut self, code: &str) -> Result<Self, ConfigError> {
        self.default_currency = Some(validate_currency(code)?);
        Ok(self)
    }
}

fn validate_currency(raw: &str) -> Result<String, ConfigError> {
    let code = raw.trim();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code.to_ascii_uppercase())
    } else {
        Err(ConfigError::InvalidCurrency(code.to_string()))
    }
}
