//! Extended counter vectors.
//!
//! The extended layout is `zone counters ++ [global, left, center, right]`,
//! where each group value is the maximum over one contiguous third of the
//! zones and `global` is the maximum of the three groups.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of zone groups (left, center, right).
pub const GROUP_COUNT: usize = 3;

/// Slots appended after the zone counters (global + one per group).
pub const EXTENDED_SLOTS: usize = GROUP_COUNT + 1;

/// Which physical side of the zone vector is reported as the "left" group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum GroupOrder {
    /// First third of the zones is "left".
    #[default]
    Forward,
    /// Last third of the zones is "left".
    Reversed,
}

impl GroupOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupOrder::Forward => "forward",
            GroupOrder::Reversed => "reversed",
        }
    }
}

impl std::str::FromStr for GroupOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "forward" => Ok(GroupOrder::Forward),
            "reversed" | "reverse" => Ok(GroupOrder::Reversed),
            other => Err(format!("unknown group order '{}'", other)),
        }
    }
}

/// Errors building an extended counter vector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CounterLayoutError {
    #[error("zone count {0} is not a positive multiple of 3")]
    ZoneCount(usize),
}

/// Zone counters extended with the global and group maxima.
///
/// Only constructible through [`CounterVector::from_zones`], so the appended
/// slots are always present.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, JsonSchema)]
pub struct CounterVector {
    values: Vec<u32>,
}

impl CounterVector {
    /// Build the extended vector from raw zone counters.
    pub fn from_zones(zones: &[u32], order: GroupOrder) -> Result<Self, CounterLayoutError> {
        if zones.is_empty() || zones.len() % GROUP_COUNT != 0 {
            return Err(CounterLayoutError::ZoneCount(zones.len()));
        }

        let group_size = zones.len() / GROUP_COUNT;
        let mut groups: Vec<u32> = zones
            .chunks(group_size)
            .map(|chunk| chunk.iter().copied().max().unwrap_or(0))
            .collect();

        if order == GroupOrder::Reversed {
            groups.reverse();
        }

        let global = groups.iter().copied().max().unwrap_or(0);

        let mut values = Vec::with_capacity(zones.len() + EXTENDED_SLOTS);
        values.extend_from_slice(zones);
        values.push(global);
        values.extend(groups);

        Ok(Self { values })
    }

    /// All-zero extended vector for `zones` zones.
    pub fn zeros(zones: usize) -> Result<Self, CounterLayoutError> {
        Self::from_zones(&vec![0; zones], GroupOrder::Forward)
    }

    /// Number of zones (excludes the appended slots).
    pub fn zone_count(&self) -> usize {
        self.values.len() - EXTENDED_SLOTS
    }

    pub fn zone_counters(&self) -> &[u32] {
        &self.values[..self.zone_count()]
    }

    pub fn global(&self) -> u32 {
        self.values[self.zone_count()]
    }

    pub fn left(&self) -> u32 {
        self.values[self.zone_count() + 1]
    }

    pub fn center(&self) -> u32 {
        self.values[self.zone_count() + 2]
    }

    pub fn right(&self) -> u32 {
        self.values[self.zone_count() + 3]
    }

    /// Largest entry of the whole extended vector.
    pub fn max(&self) -> u32 {
        self.values.iter().copied().max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extended_layout() {
        let counters = CounterVector::from_zones(&[3, 5, 2, 6, 0, 1], GroupOrder::Forward).unwrap();
        assert_eq!(counters.as_slice(), &[3, 5, 2, 6, 0, 1, 6, 5, 6, 1]);
        assert_eq!(counters.len(), 10);
        assert_eq!(counters.global(), 6);
        assert_eq!(counters.left(), 5);
        assert_eq!(counters.center(), 6);
        assert_eq!(counters.right(), 1);
    }

    #[test]
    fn test_reversed_group_order_swaps_left_and_right() {
        let counters = CounterVector::from_zones(&[3, 5, 2, 6, 0, 1], GroupOrder::Reversed).unwrap();
        assert_eq!(counters.as_slice(), &[3, 5, 2, 6, 0, 1, 6, 1, 6, 5]);
        assert_eq!(counters.left(), 1);
        assert_eq!(counters.right(), 5);
    }

    #[test]
    fn test_rejects_zone_count_not_multiple_of_three() {
        assert_eq!(
            CounterVector::from_zones(&[1, 2], GroupOrder::Forward),
            Err(CounterLayoutError::ZoneCount(2))
        );
        assert!(CounterVector::zeros(0).is_err());
    }

    #[test]
    fn test_group_order_parse() {
        assert_eq!("Reversed".parse::<GroupOrder>(), Ok(GroupOrder::Reversed));
        assert_eq!("forward".parse::<GroupOrder>(), Ok(GroupOrder::Forward));
        assert!("sideways".parse::<GroupOrder>().is_err());
    }
}
