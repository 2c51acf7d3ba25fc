//! Bounded material inventory
//!
//! `ResourceBuffer` is the facility's feed stock: an ordered store of
//! [`Material`] with a fixed capacity and a single accepted recipe.
//! Materials are consumed first-in, first-out.

use crate::composition::{Composition, Material};
use crate::error::{EnrichError, Result};
use crate::types::EPS_RSRC;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

/// Bounded store of materials sharing one accepted composition
#[derive(Debug, Clone)]
pub struct ResourceBuffer {
    capacity: f64,
    recipe: Arc<Composition>,
    contents: VecDeque<Material>,
    total: f64,
}

impl ResourceBuffer {
    /// Create an empty buffer accepting `recipe`, holding at most `capacity`
    pub fn new(capacity: f64, recipe: Arc<Composition>) -> Self {
        Self {
            capacity: capacity.max(0.0),
            recipe,
            contents: VecDeque::new(),
            total: 0.0,
        }
    }

    /// Maximum quantity the buffer can hold
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Quantity currently held
    pub fn quantity(&self) -> f64 {
        self.total
    }

    /// Remaining room, never negative
    pub fn space(&self) -> f64 {
        (self.capacity - self.total).max(0.0)
    }

    /// Accepted composition
    pub fn recipe(&self) -> &Arc<Composition> {
        &self.recipe
    }

    /// Number of stored materials
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Change the capacity. Fails if the buffer already holds more than
    /// `capacity`.
    pub fn set_capacity(&mut self, capacity: f64) -> Result<()> {
        if !capacity.is_finite() || capacity < 0.0 {
            return Err(EnrichError::config(format!(
                "buffer capacity must be finite and non-negative, got {}",
                capacity
            )));
        }
        if self.total > capacity + EPS_RSRC {
            return Err(EnrichError::capacity(self.total, capacity));
        }
        self.capacity = capacity;
        Ok(())
    }

    /// Check that a material can be pushed without mutating anything
    pub fn can_fit(&self, mat: &Material) -> Result<()> {
        if !Composition::same(mat.comp(), &self.recipe) {
            warn!(
                quantity = mat.quantity(),
                "Rejecting material that does not match the accepted recipe"
            );
            return Err(EnrichError::mismatch(
                "pushed material does not match the buffer recipe",
            ));
        }
        if mat.quantity() + self.total > self.capacity + EPS_RSRC {
            warn!(
                quantity = mat.quantity(),
                space = self.space(),
                "Rejecting material that would overfill the buffer"
            );
            return Err(EnrichError::capacity(mat.quantity(), self.space()));
        }
        Ok(())
    }

    /// Add a material
    pub fn push(&mut self, mat: Material) -> Result<()> {
        self.can_fit(&mat)?;
        self.total += mat.quantity();
        debug!(quantity = mat.quantity(), total = self.total, "Pushed material");
        self.contents.push_back(mat);
        Ok(())
    }

    /// Add a batch of materials. Nothing is stored unless the whole batch
    /// fits.
    pub fn push_all(&mut self, mats: Vec<Material>) -> Result<()> {
        let mut incoming = 0.0;
        for mat in &mats {
            self.can_fit(mat)?;
            incoming += mat.quantity();
        }
        if incoming + self.total > self.capacity + EPS_RSRC {
            warn!(
                incoming = incoming,
                space = self.space(),
                "Rejecting batch that would overfill the buffer"
            );
            return Err(EnrichError::capacity(incoming, self.space()));
        }
        for mat in mats {
            self.push(mat)?;
        }
        Ok(())
    }

    /// Remove exactly `amount`, splitting a stored material if needed
    pub fn pop_qty(&mut self, amount: f64) -> Result<Material> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(EnrichError::domain(format!(
                "pop amount must be finite and non-negative, got {}",
                amount
            )));
        }
        if amount > self.total + EPS_RSRC {
            warn!(
                amount = amount,
                held = self.total,
                "Rejecting pop larger than the inventory"
            );
            return Err(EnrichError::insufficient(amount, self.total));
        }

        let amount = amount.min(self.total);
        let mut popped = Material::new(0.0, Arc::clone(&self.recipe))?;
        let mut left = amount;
        while left > EPS_RSRC {
            let Some(mut front) = self.contents.pop_front() else {
                break;
            };
            if front.quantity() > left {
                popped.absorb(front.extract_qty(left)?)?;
                if front.quantity() > 0.0 {
                    self.contents.push_front(front);
                }
                left = 0.0;
            } else {
                left -= front.quantity();
                popped.absorb(front)?;
            }
        }

        // sub-tolerance residuals are dropped by the split
        self.total = self.contents.iter().map(Material::quantity).sum();
        debug!(amount = amount, total = self.total, "Popped material");
        Ok(popped)
    }
}
