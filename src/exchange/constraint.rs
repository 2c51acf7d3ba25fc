//! Capacity constraints and the converters that feed them
//!
//! A constraint bounds the sum, over every accepted trade of a portfolio,
//! of some quantity derived from the traded material. The derivation is a
//! closed set of converters compared by value.

use crate::composition::Material;
use crate::enrichment::{feed_qty, swu_required, uranium_assay, Assays};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Maps a traded material onto the units a constraint is measured in
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum Converter {
    /// Raw material quantity
    #[default]
    Quantity,
    /// Separative work needed to produce the material
    Swu {
        /// Feed assay the product is made from
        feed_assay: f64,
        /// Tails assay of the cascade
        tails_assay: f64,
    },
    /// Natural uranium feed needed to produce the material
    NatU {
        /// Feed assay the product is made from
        feed_assay: f64,
        /// Tails assay of the cascade
        tails_assay: f64,
    },
}

impl Converter {
    /// SWU converter for a cascade
    pub fn swu(feed_assay: f64, tails_assay: f64) -> Self {
        Self::Swu {
            feed_assay,
            tails_assay,
        }
    }

    /// Natural uranium converter for a cascade
    pub fn natu(feed_assay: f64, tails_assay: f64) -> Self {
        Self::NatU {
            feed_assay,
            tails_assay,
        }
    }

    /// Convert a material into constraint units
    pub fn convert(&self, mat: &Material) -> Result<f64> {
        match *self {
            Converter::Quantity => Ok(mat.quantity()),
            Converter::Swu {
                feed_assay,
                tails_assay,
            } => {
                let assays = Assays::new(feed_assay, uranium_assay(mat.comp())?, tails_assay);
                swu_required(mat.quantity(), &assays)
            }
            Converter::NatU {
                feed_assay,
                tails_assay,
            } => {
                let assays = Assays::new(feed_assay, uranium_assay(mat.comp())?, tails_assay);
                feed_qty(mat.quantity(), &assays)
            }
        }
    }

    /// Converter name
    pub fn name(&self) -> &str {
        match self {
            Converter::Quantity => "quantity",
            Converter::Swu { .. } => "swu",
            Converter::NatU { .. } => "natu",
        }
    }
}

/// Upper bound on the converted total of a portfolio's accepted trades
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapacityConstraint {
    capacity: f64,
    converter: Converter,
}

impl CapacityConstraint {
    /// Constraint on raw quantity
    pub fn new(capacity: f64) -> Self {
        Self {
            capacity,
            converter: Converter::Quantity,
        }
    }

    /// Constraint measured through `converter`
    pub fn with_converter(capacity: f64, converter: Converter) -> Self {
        Self {
            capacity,
            converter,
        }
    }

    /// Limit of the constraint
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Converter of the constraint
    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    /// Units `mat` would consume against this constraint
    pub fn convert(&self, mat: &Material) -> Result<f64> {
        self.converter.convert(mat)
    }
}
