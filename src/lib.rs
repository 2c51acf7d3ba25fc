//! # Enrichment Facility
//!
//! Decision engine for a uranium enrichment facility taking part in a
//! discrete-time commodity exchange. Each step the facility requests
//! natural uranium feed, bids enriched product against requests from other
//! agents, and executes the trades the host matched for it.
//!
//! ## Features
//!
//! - **Composition & Material**: Normalized isotope vectors and quantities
//! - **Inventory Buffer**: Bounded FIFO store of feed in a single recipe
//! - **Enrichment Physics**: Value function, feed and SWU balances
//! - **Capacity Constraints**: Quantity, SWU and natural uranium converters
//! - **Exchange**: Request and bid portfolios, trade execution
//! - **Metrics**: Prometheus-compatible metrics export
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use enrichment_facility::prelude::*;
//!
//! fn main() -> enrichment_facility::Result<()> {
//!     let natl_u = Composition::from_atom([(NucId::U235, 0.0072), (NucId::U238, 0.9928)])?;
//!     let recipes = RecipeBook::new().with_recipe("natl_u", natl_u);
//!     let config = FacilityConfig::new().inventory_size(100.0).swu_capacity(50.0);
//!
//!     let mut facility = EnrichmentFacility::new(config, &recipes)?;
//!     facility.tick(0);
//!     let requests = facility.add_matl_requests()?;
//!     assert_eq!(requests.len(), 1);
//!     facility.tock(0);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod buffer;
pub mod composition;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod exchange;
pub mod facility;
pub mod fleet;
pub mod metrics;
pub mod types;

// Re-exports for ergonomic API
pub use buffer::ResourceBuffer;
pub use composition::{Composition, Material, RecipeBook};
pub use config::FacilityConfig;
pub use enrichment::{feed_qty, swu_required, tails_qty, uranium_assay, value_function, Assays};
pub use error::{EnrichError, Result};
pub use exchange::{
    Bid, BidPortfolio, CapacityConstraint, Converter, ExchangeContext, Request, RequestPortfolio,
    Trade,
};
pub use facility::{EnrichmentFacility, Model, Trader};
pub use metrics::FacilityMetrics;
pub use types::{AgentId, NucId, EPS_RSRC};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::composition::{Composition, Material, RecipeBook};
    pub use crate::config::FacilityConfig;
    pub use crate::error::Result;
    pub use crate::exchange::{ExchangeContext, Trade};
    pub use crate::facility::{EnrichmentFacility, Model, Trader};
    pub use crate::types::{AgentId, NucId};
}
