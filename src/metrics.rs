//! Prometheus metrics for an enrichment facility
//!
//! ## Table of Contents
//! - **FacilityMetrics**: Counters and gauges updated by trade execution

use crate::error::{EnrichError, Result};
use prometheus::{Counter, CounterVec, Gauge, Opts, Registry};

/// Core metrics for one facility
pub struct FacilityMetrics {
    registry: Registry,

    // Exchange metrics
    /// Bids placed, by commodity
    pub bids_offered: CounterVec,
    /// Feed pushed into the inventory (kg)
    pub feed_accepted: Counter,
    /// Product shipped, by commodity (kg)
    pub product_shipped: CounterVec,

    // Cascade metrics
    /// Separative work consumed
    pub swu_consumed: Counter,
    /// Tails produced (kg)
    pub tails_produced: Counter,
    /// SWU left in the current step
    pub swu_available: Gauge,

    // Inventory metrics
    /// Feed held (kg)
    pub inventory: Gauge,
}

impl FacilityMetrics {
    /// Create a new metrics instance with its own registry
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let bids_offered = CounterVec::new(
            Opts::new("enrich_bids_offered_total", "Total bids offered"),
            &["commodity"],
        )?;
        let feed_accepted = Counter::new("enrich_feed_accepted_kg_total", "Feed accepted (kg)")?;
        let product_shipped = CounterVec::new(
            Opts::new("enrich_product_shipped_kg_total", "Product shipped (kg)"),
            &["commodity"],
        )?;

        let swu_consumed = Counter::new("enrich_swu_consumed_total", "Separative work consumed")?;
        let tails_produced = Counter::new("enrich_tails_produced_kg_total", "Tails produced (kg)")?;
        let swu_available = Gauge::new("enrich_swu_available", "SWU left in the current step")?;

        let inventory = Gauge::new("enrich_inventory_kg", "Feed inventory (kg)")?;

        registry.register(Box::new(bids_offered.clone()))?;
        registry.register(Box::new(feed_accepted.clone()))?;
        registry.register(Box::new(product_shipped.clone()))?;
        registry.register(Box::new(swu_consumed.clone()))?;
        registry.register(Box::new(tails_produced.clone()))?;
        registry.register(Box::new(swu_available.clone()))?;
        registry.register(Box::new(inventory.clone()))?;

        Ok(Self {
            registry,
            bids_offered,
            feed_accepted,
            product_shipped,
            swu_consumed,
            tails_produced,
            swu_available,
            inventory,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record bids placed on a commodity
    pub fn record_bids(&self, commodity: &str, count: usize) {
        self.bids_offered
            .with_label_values(&[commodity])
            .inc_by(count as f64);
    }

    /// Record feed pushed into the inventory
    pub fn record_feed(&self, qty: f64, inventory: f64) {
        self.feed_accepted.inc_by(qty.max(0.0));
        self.inventory.set(inventory);
    }

    /// Record one shipped product
    pub fn record_product(&self, commodity: &str, qty: f64, swu: f64, tails: f64, inventory: f64) {
        self.product_shipped
            .with_label_values(&[commodity])
            .inc_by(qty.max(0.0));
        self.swu_consumed.inc_by(swu.max(0.0));
        self.tails_produced.inc_by(tails.max(0.0));
        self.inventory.set(inventory);
    }

    /// Update the SWU left in the current step
    pub fn set_swu_available(&self, swu: f64) {
        self.swu_available.set(swu);
    }

    /// Gather all metrics as text
    pub fn gather_text(&self) -> Result<String> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| EnrichError::metrics(format!("Encode error: {}", e)))?;
        String::from_utf8(buffer).map_err(|e| EnrichError::metrics(format!("UTF8 error: {}", e)))
    }
}

impl std::fmt::Debug for FacilityMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacilityMetrics")
            .field("inventory", &self.inventory.get())
            .field("swu_available", &self.swu_available.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = FacilityMetrics::new().unwrap();
        assert!(metrics.gather_text().is_ok());
    }

    #[test]
    fn test_feed_and_product() {
        let metrics = FacilityMetrics::new().unwrap();

        metrics.record_feed(2.0, 2.0);
        metrics.record_feed(1.0, 3.0);
        metrics.record_product("enr_u", 0.5, 2.0, 1.5, 1.0);

        let text = metrics.gather_text().unwrap();
        assert!(text.contains("enrich_feed_accepted_kg_total 3"));
        assert!(text.contains("enrich_inventory_kg 1"));
        assert!(text.contains("enrich_swu_consumed_total 2"));
        assert!(text.contains("enrich_product_shipped_kg_total{commodity=\"enr_u\"} 0.5"));
    }

    #[test]
    fn test_bid_metrics() {
        let metrics = FacilityMetrics::new().unwrap();
        metrics.record_bids("enr_u", 4);
        let text = metrics.gather_text().unwrap();
        assert!(text.contains("enrich_bids_offered_total{commodity=\"enr_u\"} 4"));
    }
}
