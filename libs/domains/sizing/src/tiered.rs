//! Tiered Pricing Resolver
//!
//! Piecewise table lookup shared by instance-rate tables, user-volume tiers
//! and pack-based licensing. A value above every explicit bound resolves to
//! the last (open-ended) tier instead of failing.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// One tier: applies to values up to and including `up_to`; `None` is unbounded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierEntry<T> {
    pub up_to: Option<f64>,
    pub price: T,
}

/// Ordered list of tiers with ascending upper bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierTable<T> {
    tiers: Vec<TierEntry<T>>,
}

impl<T> Default for TierTable<T> {
    fn default() -> Self {
        Self { tiers: Vec::new() }
    }
}

impl<T> TierTable<T> {
    pub fn new(tiers: Vec<TierEntry<T>>) -> Self {
        Self { tiers }
    }

    /// Build from `(upper_bound, price)` pairs
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Option<f64>, T)>) -> Self {
        Self {
            tiers: pairs
                .into_iter()
                .map(|(up_to, price)| TierEntry { up_to, price })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn tiers(&self) -> &[TierEntry<T>] {
        &self.tiers
    }

    /// First tier whose bound covers `value`, else the last tier
    pub fn resolve(&self, value: f64) -> Option<&T> {
        self.tiers
            .iter()
            .find(|tier| tier.up_to.is_none_or(|bound| bound >= value))
            .or_else(|| self.tiers.last())
            .map(|tier| &tier.price)
    }

    /// Like [`TierTable::resolve`] but an empty table is a configuration error
    pub fn require(&self, value: f64, table_name: &str) -> Result<&T, ConfigurationError> {
        self.resolve(value)
            .ok_or_else(|| ConfigurationError::MissingPricingTable(table_name.to_string()))
    }
}

/// Price for `value` in a non-empty table
pub fn resolve_tier<T: Clone>(table: &TierTable<T>, value: f64) -> Option<T> {
    table.resolve(value).cloned()
}

/// Packs needed for `quantity`; at least one pack is always allocated
pub fn resolve_pack_count(quantity: i64, pack_size: u32) -> u32 {
    let pack_size = i64::from(pack_size.max(1));
    let quantity = quantity.max(1);
    ((quantity + pack_size - 1) / pack_size) as u32
}

/// Result of allocating a quantity into fixed-size packs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PackAllocation {
    pub quantity: u32,
    pub pack_size: u32,
    pub packs: u32,
}

impl PackAllocation {
    pub fn allocate(quantity: u32, pack_size: u32) -> Self {
        Self {
            quantity,
            pack_size,
            packs: resolve_pack_count(i64::from(quantity), pack_size),
        }
    }

    /// Units bought but not needed
    pub fn spare_units(&self) -> u32 {
        (self.packs * self.pack_size.max(1)).saturating_sub(self.quantity)
    }

    pub fn cost(&self, price_per_pack: f64) -> f64 {
        f64::from(self.packs) * price_per_pack
    }
}
