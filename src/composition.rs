//! Compositions, materials and named recipes
//!
//! ## Table of Contents
//! - **Composition**: Immutable nuclide → atom fraction mapping
//! - **Material**: A quantity (kg) of a shared composition
//! - **RecipeBook**: Named compositions supplied by the host

use crate::error::{EnrichError, Result};
use crate::types::{NucId, EPS_RSRC};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Immutable isotopic composition, stored as normalized atom fractions.
///
/// Fractions handed to the constructors are relative proportions; they are
/// normalized once and never changed afterwards. Materials share a
/// composition through an `Arc`, and any change in fractions produces a new
/// `Composition`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<NucId, f64>", into = "BTreeMap<NucId, f64>")]
pub struct Composition {
    atoms: BTreeMap<NucId, f64>,
}

impl Composition {
    /// Build a composition from relative atom proportions
    pub fn from_atom(v: impl IntoIterator<Item = (NucId, f64)>) -> Result<Arc<Self>> {
        Ok(Arc::new(Self::normalized(v)?))
    }

    /// Build a composition from relative mass proportions
    pub fn from_mass(v: impl IntoIterator<Item = (NucId, f64)>) -> Result<Arc<Self>> {
        let mut atoms = Vec::new();
        for (nuc, mass) in v {
            check_fraction(nuc, mass)?;
            atoms.push((nuc, mass / nuc.molar_mass()));
        }
        Self::from_atom(atoms)
    }

    fn normalized(v: impl IntoIterator<Item = (NucId, f64)>) -> Result<Self> {
        let mut atoms: BTreeMap<NucId, f64> = BTreeMap::new();
        for (nuc, frac) in v {
            check_fraction(nuc, frac)?;
            if frac > 0.0 {
                *atoms.entry(nuc).or_insert(0.0) += frac;
            }
        }

        let total: f64 = atoms.values().sum();
        if total > 0.0 {
            for frac in atoms.values_mut() {
                *frac /= total;
            }
        }
        Ok(Self { atoms })
    }

    /// Atom fraction of a nuclide (0 when absent)
    pub fn atom_frac(&self, nuc: NucId) -> f64 {
        self.atoms.get(&nuc).copied().unwrap_or(0.0)
    }

    /// Mass fraction of a nuclide (0 when absent)
    pub fn mass_frac(&self, nuc: NucId) -> f64 {
        let total = self.molar_mass();
        if total <= 0.0 {
            return 0.0;
        }
        self.atom_frac(nuc) * nuc.molar_mass() / total
    }

    /// Mean molar mass of the composition
    pub fn molar_mass(&self) -> f64 {
        self.atoms
            .iter()
            .map(|(nuc, frac)| frac * nuc.molar_mass())
            .sum()
    }

    /// Normalized atom fractions
    pub fn atoms(&self) -> &BTreeMap<NucId, f64> {
        &self.atoms
    }

    /// Normalized mass fractions
    pub fn mass(&self) -> BTreeMap<NucId, f64> {
        self.atoms
            .keys()
            .map(|nuc| (*nuc, self.mass_frac(*nuc)))
            .collect()
    }

    /// True when no nuclide has a non-zero fraction
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Compare fractions nuclide by nuclide within `EPS_RSRC`
    pub fn almost_eq(&self, other: &Composition) -> bool {
        self.atoms
            .keys()
            .chain(other.atoms.keys())
            .all(|nuc| (self.atom_frac(*nuc) - other.atom_frac(*nuc)).abs() <= EPS_RSRC)
    }

    /// Same shared handle, or equal fractions
    pub fn same(a: &Arc<Composition>, b: &Arc<Composition>) -> bool {
        Arc::ptr_eq(a, b) || a.almost_eq(b)
    }
}

fn check_fraction(nuc: NucId, frac: f64) -> Result<()> {
    if !frac.is_finite() || frac < 0.0 {
        return Err(EnrichError::domain(format!(
            "fraction for nuclide {} must be finite and non-negative, got {}",
            nuc, frac
        )));
    }
    Ok(())
}

impl TryFrom<BTreeMap<NucId, f64>> for Composition {
    type Error = EnrichError;

    fn try_from(v: BTreeMap<NucId, f64>) -> Result<Self> {
        Self::normalized(v)
    }
}

impl From<Composition> for BTreeMap<NucId, f64> {
    fn from(comp: Composition) -> Self {
        comp.atoms
    }
}

/// A quantity of material with a shared composition
#[derive(Debug, Clone)]
pub struct Material {
    quantity: f64,
    comp: Arc<Composition>,
}

impl Material {
    /// Create a material; the quantity must be finite and non-negative
    pub fn new(quantity: f64, comp: Arc<Composition>) -> Result<Self> {
        if !quantity.is_finite() || quantity < 0.0 {
            return Err(EnrichError::domain(format!(
                "material quantity must be finite and non-negative, got {}",
                quantity
            )));
        }
        Ok(Self { quantity, comp })
    }

    /// Quantity in kg
    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    /// Shared composition handle
    pub fn comp(&self) -> &Arc<Composition> {
        &self.comp
    }

    /// True when the quantity is within tolerance of zero
    pub fn is_empty(&self) -> bool {
        self.quantity <= EPS_RSRC
    }

    /// Split `qty` off this material. The extracted part shares the
    /// composition; the residual keeps it unchanged.
    pub fn extract_qty(&mut self, qty: f64) -> Result<Material> {
        if !qty.is_finite() || qty < 0.0 {
            return Err(EnrichError::domain(format!(
                "extracted quantity must be finite and non-negative, got {}",
                qty
            )));
        }
        if qty > self.quantity + EPS_RSRC {
            return Err(EnrichError::insufficient(qty, self.quantity));
        }
        let taken = qty.min(self.quantity);
        self.quantity -= taken;
        if self.quantity < EPS_RSRC {
            self.quantity = 0.0;
        }
        Ok(Material {
            quantity: taken,
            comp: Arc::clone(&self.comp),
        })
    }

    /// Merge another material into this one. Identical compositions keep
    /// the shared handle; differing ones are mixed by mass into a new
    /// composition.
    pub fn absorb(&mut self, other: Material) -> Result<()> {
        if Composition::same(&self.comp, &other.comp) || other.quantity <= 0.0 {
            self.quantity += other.quantity;
            return Ok(());
        }
        if self.quantity <= 0.0 {
            *self = other;
            return Ok(());
        }

        let mut masses: BTreeMap<NucId, f64> = BTreeMap::new();
        for (qty, comp) in [(self.quantity, &self.comp), (other.quantity, &other.comp)] {
            for (nuc, frac) in comp.mass() {
                *masses.entry(nuc).or_insert(0.0) += qty * frac;
            }
        }
        self.comp = Composition::from_mass(masses)?;
        self.quantity += other.quantity;
        Ok(())
    }
}

/// Named compositions available to a facility
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeBook {
    recipes: BTreeMap<String, Arc<Composition>>,
}

impl RecipeBook {
    /// Create an empty recipe book
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a recipe
    pub fn add_recipe(&mut self, name: impl Into<String>, comp: Arc<Composition>) {
        self.recipes.insert(name.into(), comp);
    }

    /// Add a recipe, builder style
    pub fn with_recipe(mut self, name: impl Into<String>, comp: Arc<Composition>) -> Self {
        self.add_recipe(name, comp);
        self
    }

    /// Look up a recipe by name
    pub fn get(&self, name: &str) -> Result<Arc<Composition>> {
        self.recipes
            .get(name)
            .cloned()
            .ok_or_else(|| EnrichError::config(format!("unknown recipe '{}'", name)))
    }

    /// Number of recipes
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// True when no recipe is registered
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}
