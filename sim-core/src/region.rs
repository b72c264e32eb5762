//! Regions: the fixed geography catalogue. Regions are seeded once
//! at world construction and never created or destroyed during a run.

use serde::{Deserialize, Serialize};

use crate::config::{SimConfig, region_pair_key};
use crate::types::RegionId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub code: String,
    pub name: String,
}

/// Build the fixed three-region catalogue (`CORE`, `INDUSTRIAL`, `FRONTIER`),
/// matching the codes the default `ShipmentConfig`/`WorkforceConfig` travel
/// and salary tables are keyed by.
pub fn seed_regions() -> Vec<Region> {
    vec![
        Region {
            id: RegionId::new(1),
            code: "CORE".to_string(),
            name: "Core".to_string(),
        },
        Region {
            id: RegionId::new(2),
            code: "INDUSTRIAL".to_string(),
            name: "Industrial".to_string(),
        },
        Region {
            id: RegionId::new(3),
            code: "FRONTIER".to_string(),
            name: "Frontier".to_string(),
        },
    ]
}

/// Base travel time in ticks between two regions, looked up by region code.
/// Same-region shipments always take zero ticks.
pub fn travel_ticks(config: &SimConfig, from: &Region, to: &Region) -> u64 {
    if from.id == to.id {
        return 0;
    }
    let key = region_pair_key(&from.code, &to.code);
    config
        .shipment
        .travel_ticks_by_region_codes
        .get(&key)
        .copied()
        .unwrap_or(config.shipment.travel_ticks_by_region_codes.values().copied().max().unwrap_or(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_regions_produces_three_distinct_codes() {
        let regions = seed_regions();
        assert_eq!(regions.len(), 3);
        let codes: std::collections::HashSet<_> = regions.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes.len(), 3);
    }

    #[test]
    fn travel_ticks_is_symmetric_and_zero_within_region() {
        let config = SimConfig::default();
        let regions = seed_regions();
        let core = &regions[0];
        let industrial = &regions[1];
        assert_eq!(travel_ticks(&config, core, core), 0);
        assert_eq!(
            travel_ticks(&config, core, industrial),
            travel_ticks(&config, industrial, core)
        );
    }
}
