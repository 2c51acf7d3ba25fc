//! Facility configuration
//!
//! ## Table of Contents
//! - **FacilityConfig**: Keys supplied once when a facility is built
//!
//! The host may build the config in code or load it from JSON; every key is
//! optional in JSON and falls back to its default.

use crate::error::{EnrichError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for an enrichment facility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacilityConfig {
    /// Commodity the facility requests feed on
    pub in_commodity: String,
    /// Recipe name of the accepted feed
    pub in_recipe: String,
    /// Maximum feed inventory (kg)
    pub inventory_size: f64,
    /// Commodity the facility bids product on
    pub out_commodity: String,
    /// Tails assay of the cascade
    pub tails_assay: f64,
    /// Separative work available per time step (SWU)
    pub swu_capacity: f64,
    /// Assay of the accepted feed
    pub feed_assay: f64,
    /// Price of the product commodity, passed through to the host
    pub commodity_price: f64,
}

impl Default for FacilityConfig {
    fn default() -> Self {
        Self {
            in_commodity: "natl_u".to_string(),
            in_recipe: "natl_u".to_string(),
            inventory_size: 1000.0,
            out_commodity: "enr_u".to_string(),
            tails_assay: 0.003,
            swu_capacity: 1000.0,
            feed_assay: 0.0072,
            commodity_price: 0.0,
        }
    }
}

impl FacilityConfig {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the feed commodity
    pub fn in_commodity(mut self, commodity: impl Into<String>) -> Self {
        self.in_commodity = commodity.into();
        self
    }

    /// Set the feed recipe name
    pub fn in_recipe(mut self, recipe: impl Into<String>) -> Self {
        self.in_recipe = recipe.into();
        self
    }

    /// Set the maximum feed inventory
    pub fn inventory_size(mut self, size: f64) -> Self {
        self.inventory_size = size;
        self
    }

    /// Set the product commodity
    pub fn out_commodity(mut self, commodity: impl Into<String>) -> Self {
        self.out_commodity = commodity.into();
        self
    }

    /// Set the tails assay
    pub fn tails_assay(mut self, assay: f64) -> Self {
        self.tails_assay = assay;
        self
    }

    /// Set the per-step SWU capacity
    pub fn swu_capacity(mut self, swu: f64) -> Self {
        self.swu_capacity = swu;
        self
    }

    /// Set the feed assay
    pub fn feed_assay(mut self, assay: f64) -> Self {
        self.feed_assay = assay;
        self
    }

    /// Set the commodity price
    pub fn commodity_price(mut self, price: f64) -> Self {
        self.commodity_price = price;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.in_commodity.trim().is_empty() {
            return Err(EnrichError::config("in_commodity cannot be empty"));
        }
        if self.out_commodity.trim().is_empty() {
            return Err(EnrichError::config("out_commodity cannot be empty"));
        }
        if self.in_recipe.trim().is_empty() {
            return Err(EnrichError::config("in_recipe cannot be empty"));
        }
        if !self.inventory_size.is_finite() || self.inventory_size < 0.0 {
            return Err(EnrichError::config(
                "inventory_size must be finite and non-negative",
            ));
        }
        if !self.swu_capacity.is_finite() || self.swu_capacity < 0.0 {
            return Err(EnrichError::config(
                "swu_capacity must be finite and non-negative",
            ));
        }
        if !(self.tails_assay > 0.0 && self.feed_assay < 1.0) {
            return Err(EnrichError::config(
                "tails_assay and feed_assay must lie in (0, 1)",
            ));
        }
        if self.tails_assay >= self.feed_assay {
            return Err(EnrichError::config(
                "tails_assay must be lower than feed_assay",
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON config
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: FacilityConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Human-readable summary of the configuration
    pub fn describe(&self) -> String {
        format!(
            "in: {} ({}), inventory_size: {}, out: {}, feed_assay: {}, tails_assay: {}, swu_capacity: {}, price: {}",
            self.in_commodity,
            self.in_recipe,
            self.inventory_size,
            self.out_commodity,
            self.feed_assay,
            self.tails_assay,
            self.swu_capacity,
            self.commodity_price,
        )
    }
}
