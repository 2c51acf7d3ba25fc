//! Core identifier types
//!
//! ## Table of Contents
//! - **EPS_RSRC**: Shared tolerance for quantity comparisons
//! - **NucId**: Nuclide identifier in `ZZZAAA` form (e.g. 92235)
//! - **AgentId**: Unique identifier for a trading agent

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Tolerance used for every material quantity comparison
pub const EPS_RSRC: f64 = 1e-6;

/// Nuclide identifier encoded as `Z * 1000 + A`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NucId(u32);

impl NucId {
    /// Uranium-234
    pub const U234: NucId = NucId(92234);
    /// Uranium-235, the fissile isotope of the enrichment balance
    pub const U235: NucId = NucId(92235);
    /// Uranium-238, the fertile isotope of the enrichment balance
    pub const U238: NucId = NucId(92238);

    /// Create a NucId from its `ZZZAAA` encoding
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw encoding
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Atomic number (Z)
    pub fn atomic_number(&self) -> u32 {
        self.0 / 1000
    }

    /// Mass number (A)
    pub fn mass_number(&self) -> u32 {
        self.0 % 1000
    }

    /// Molar mass in g/mol, approximated by the mass number
    pub fn molar_mass(&self) -> f64 {
        f64::from(self.mass_number().max(1))
    }
}

impl fmt::Display for NucId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for NucId {
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

/// Unique identifier for an agent taking part in the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(Uuid);

impl AgentId {
    /// Create a new random AgentId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an AgentId from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent-{}", &self.0.to_string()[..8])
    }
}
