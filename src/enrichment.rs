//! Enrichment physics for a two-isotope (U-235 / U-238) cascade
//!
//! All functions are pure. Assays are U-235 atom fractions of the
//! U-235 + U-238 balance; trace isotopes are ignored.
//!
//! Mass balance, with `F`, `P`, `T` the feed, product and tails quantities:
//!
//! ```text
//! F = P * (x_p - x_t) / (x_f - x_t)
//! T = F - P
//! SWU = P * V(x_p) + T * V(x_t) - F * V(x_f)
//! V(x) = (2x - 1) * ln(x / (1 - x))
//! ```

use crate::composition::Composition;
use crate::error::{EnrichError, Result};
use crate::types::{NucId, EPS_RSRC};
use serde::{Deserialize, Serialize};

/// Feed, product and tails assays of one enrichment operation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Assays {
    /// Feed assay
    pub feed: f64,
    /// Product assay
    pub product: f64,
    /// Tails assay
    pub tails: f64,
}

impl Assays {
    /// Create a set of assays
    pub fn new(feed: f64, product: f64, tails: f64) -> Self {
        Self {
            feed,
            product,
            tails,
        }
    }

    /// Check that every assay lies in (0, 1) and that feed is separable
    pub fn validate(&self) -> Result<()> {
        for (name, x) in [
            ("feed", self.feed),
            ("product", self.product),
            ("tails", self.tails),
        ] {
            check_open_unit(name, x)?;
        }
        if self.feed - self.tails <= EPS_RSRC {
            return Err(EnrichError::domain(format!(
                "feed assay {} must exceed tails assay {}",
                self.feed, self.tails
            )));
        }
        Ok(())
    }
}

fn check_open_unit(name: &str, x: f64) -> Result<()> {
    if !(x > 0.0 && x < 1.0) {
        return Err(EnrichError::domain(format!(
            "{} assay {} is outside (0, 1)",
            name, x
        )));
    }
    Ok(())
}

fn check_qty(qty: f64) -> Result<()> {
    if !qty.is_finite() || qty < 0.0 {
        return Err(EnrichError::domain(format!(
            "product quantity must be finite and non-negative, got {}",
            qty
        )));
    }
    Ok(())
}

/// Separation potential `V(x) = (2x - 1) ln(x / (1 - x))`
pub fn value_function(x: f64) -> Result<f64> {
    check_open_unit("value function", x)?;
    Ok((2.0 * x - 1.0) * (x / (1.0 - x)).ln())
}

/// Natural uranium feed needed to make `product_qty` at the given assays
pub fn feed_qty(product_qty: f64, assays: &Assays) -> Result<f64> {
    check_qty(product_qty)?;
    assays.validate()?;
    let factor = (assays.product - assays.tails) / (assays.feed - assays.tails);
    Ok(product_qty * factor)
}

/// Tails produced alongside `product_qty`
pub fn tails_qty(product_qty: f64, assays: &Assays) -> Result<f64> {
    let feed = feed_qty(product_qty, assays)?;
    Ok(feed - product_qty)
}

/// Separative work needed to make `product_qty` at the given assays
pub fn swu_required(product_qty: f64, assays: &Assays) -> Result<f64> {
    let feed = feed_qty(product_qty, assays)?;
    let tails = feed - product_qty;
    let swu = product_qty * value_function(assays.product)?
        + tails * value_function(assays.tails)?
        - feed * value_function(assays.feed)?;
    Ok(swu)
}

/// U-235 fraction of the U-235 + U-238 balance of a composition.
///
/// Fails with a domain error when the composition carries no U-238, since
/// the product stream could never be separated from it.
pub fn uranium_assay(comp: &Composition) -> Result<f64> {
    let u235 = comp.atom_frac(NucId::U235);
    let u238 = comp.atom_frac(NucId::U238);
    if u238 <= 0.0 {
        return Err(EnrichError::domain("composition has no U-238"));
    }
    Ok(u235 / (u235 + u238))
}
