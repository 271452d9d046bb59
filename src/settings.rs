//! Application-wide settings.
//!
//! Settings are persisted as a single JSON blob. Loading merges the stored blob over
//! [`Settings::default`], so fields introduced after a blob was written still get a value.

use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::invoice::{DEFAULT_TAX_LABEL, deserialize_bigdecimal, serialize_bigdecimal};

/// Key the settings blob is stored under.
pub const SETTINGS_KEY: &str = "app_settings";

/// Business name a fresh install starts with. While it is still in place the application has
/// not been onboarded.
pub const DEFAULT_BUSINESS_NAME: &str = "Invoicely";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogoPosition {
    Left,
    Right,
    Center,
}

/// Horizontal placement used for the client block and the totals block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

fn serialize_opt_bigdecimal<S>(value: &Option<BigDecimal>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(v) => serialize_bigdecimal(v, serializer),
        None => serializer.serialize_none(),
    }
}

fn deserialize_opt_bigdecimal<'de, D>(deserializer: D) -> Result<Option<BigDecimal>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrap(#[serde(deserialize_with = "deserialize_bigdecimal")] BigDecimal);

    Ok(Option::<Wrap>::deserialize(deserializer)?.map(|Wrap(v)| v))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub business_name: String,
    pub business_address: String,
    /// Asset reference as returned by [`crate::assets::save_asset`], or empty for no logo.
    pub logo_url: String,
    pub theme: Theme,
    pub logo_position: LogoPosition,
    pub client_details_position: Side,
    pub amount_position: Side,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_label: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_bigdecimal",
        deserialize_with = "deserialize_opt_bigdecimal"
    )]
    pub tax_rate: Option<BigDecimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom_level: Option<f64>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            business_name: DEFAULT_BUSINESS_NAME.to_string(),
            business_address: String::new(),
            logo_url: String::new(),
            theme: Theme::Light,
            logo_position: LogoPosition::Right,
            client_details_position: Side::Left,
            amount_position: Side::Right,
            tax_label: None,
            tax_rate: None,
            zoom_level: Some(1.0),
        }
    }
}

impl Settings {
    /// Tax label new invoices start with.
    pub fn default_tax_label(&self) -> String {
        match &self.tax_label {
            Some(label) if !label.trim().is_empty() => label.clone(),
            _ => DEFAULT_TAX_LABEL.to_string(),
        }
    }

    /// Tax rate new invoices start with, zero when unset.
    pub fn default_tax_rate(&self) -> BigDecimal {
        self.tax_rate.clone().unwrap_or_else(BigDecimal::zero)
    }

    pub fn is_onboarded(&self) -> bool {
        let name = self.business_name.trim();
        !name.is_empty() && name != DEFAULT_BUSINESS_NAME
    }

    pub fn has_logo(&self) -> bool {
        !self.logo_url.trim().is_empty()
    }
}
