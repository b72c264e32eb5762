//! Buildings: production facilities, warehouses, and corporate structures
//! owned by a company in a region.

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::error::{DomainError, Result};
use crate::types::{BuildingId, BuildingStatus, BuildingType, Cents, CompanyId, RegionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub id: BuildingId,
    pub company_id: CompanyId,
    pub region_id: RegionId,
    pub building_type: BuildingType,
    pub status: BuildingStatus,
    pub acquired_at_tick: u64,
    /// Tick of the last operating-cost sweep charged against this building.
    pub last_operating_cost_tick: u64,
    #[serde(with = "crate::types::cents_as_string")]
    pub acquisition_cost_cents: Cents,
    #[serde(with = "crate::types::cents_as_string")]
    pub weekly_operating_cost_cents: Cents,
    /// Storage slots this building contributes; only meaningful for
    /// warehouses, zero for every other building type.
    pub capacity_slots: u32,
}

impl Building {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: BuildingId,
        company_id: CompanyId,
        region_id: RegionId,
        building_type: BuildingType,
        acquired_at_tick: u64,
        acquisition_cost_cents: Cents,
        weekly_operating_cost_cents: Cents,
        capacity_slots: u32,
    ) -> Self {
        Self {
            id,
            company_id,
            region_id,
            building_type,
            status: BuildingStatus::Active,
            acquired_at_tick,
            last_operating_cost_tick: acquired_at_tick,
            acquisition_cost_cents,
            weekly_operating_cost_cents,
            capacity_slots,
        }
    }

    /// Whether `current_tick` lands on this building's operating-cost sweep
    /// boundary, given the configured interval.
    pub fn is_due_for_operating_cost(&self, current_tick: u64, config: &SimConfig) -> bool {
        self.status == BuildingStatus::Active
            && current_tick >= self.last_operating_cost_tick + config.buildings.operating_cost_interval_ticks
    }

    pub fn reactivate(&mut self, current_tick: u64) -> Result<()> {
        if self.status != BuildingStatus::Inactive {
            return Err(DomainError::DomainInvariant(
                "only an inactive building can be reactivated".into(),
            ));
        }
        self.status = BuildingStatus::Active;
        self.last_operating_cost_tick = current_tick;
        Ok(())
    }

    pub fn deactivate(&mut self) {
        self.status = BuildingStatus::Inactive;
    }
}

/// Total storage capacity a company has in a region: a base allowance plus
/// `warehouse_capacity_per_slot` for every slot contributed by its active
/// warehouses there.
pub fn regional_storage_capacity(
    config: &SimConfig,
    active_warehouse_capacity_slots: u32,
) -> i64 {
    config.buildings.base_storage_per_region
        + config.buildings.warehouse_capacity_per_slot * active_warehouse_capacity_slots as i64
}
