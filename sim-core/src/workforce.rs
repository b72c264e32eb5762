//! Workforce: per-company headcount capacity, allocation, and the derived
//! duration/travel multipliers.

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::error::{DomainError, Result};
use crate::types::{Bps, CompanyId, WorkforceAllocation, WorkforceDeltaId, WorkforceFunction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workforce {
    pub company_id: CompanyId,
    pub capacity: u32,
    pub allocation: WorkforceAllocation,
    /// Running corporate efficiency score in bps (10_000 = full efficiency),
    /// nudged each tick toward 10_000 while corporate allocation holds and
    /// pulled down by layoffs, hiring shocks, and salary shortfalls.
    pub corporate_efficiency_bps: Bps,
    /// Capacity brought on by the most recent hire(s), still within the
    /// configured hiring-shock window and so still dragging on efficiency.
    pub pending_hiring_shock_capacity: u32,
    /// Last tick at which the hiring shock above still applies; past this
    /// tick the shock capacity is stale and no longer penalised.
    pub hiring_shock_expires_tick: u64,
}

impl Workforce {
    pub fn new(company_id: CompanyId, capacity: u32) -> Self {
        Self {
            company_id,
            capacity,
            allocation: WorkforceAllocation::default(),
            corporate_efficiency_bps: 10_000,
            pending_hiring_shock_capacity: 0,
            hiring_shock_expires_tick: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkforceDelta {
    pub id: WorkforceDeltaId,
    pub company_id: CompanyId,
    pub capacity_delta: i64,
    pub requested_at_tick: u64,
    pub effective_at_tick: u64,
}

/// Validate a capacity-change request against the per-request absolute and
/// relative caps.
pub fn validate_capacity_change(
    config: &SimConfig,
    current_capacity: u32,
    capacity_delta: i64,
) -> Result<()> {
    if capacity_delta == 0 {
        return Err(DomainError::DomainInvariant(
            "capacity delta must be non-zero".into(),
        ));
    }
    let abs_delta = capacity_delta.unsigned_abs();
    if abs_delta > config.workforce.max_absolute_capacity_delta_per_request as u64 {
        return Err(DomainError::DomainInvariant(format!(
            "capacity delta {capacity_delta} exceeds absolute cap {}",
            config.workforce.max_absolute_capacity_delta_per_request
        )));
    }
    let relative_cap =
        (current_capacity as u64 * config.workforce.max_relative_capacity_delta_pct_per_request as u64) / 100;
    if abs_delta > relative_cap.max(1) {
        return Err(DomainError::DomainInvariant(format!(
            "capacity delta {capacity_delta} exceeds relative cap of {relative_cap} for current capacity {current_capacity}"
        )));
    }
    if capacity_delta < 0 && capacity_delta.unsigned_abs() > current_capacity as u64 {
        return Err(DomainError::DomainInvariant(
            "cannot reduce capacity below zero".into(),
        ));
    }
    Ok(())
}

/// Corporate efficiency movement applied once per tick: recovers toward
/// 10_000 bps (scaled by how much allocation actually backs corporate
/// functions) while corporate allocation is at or above the healthy
/// threshold, otherwise is penalised; a still-active hiring shock and a
/// salary shortfall each subtract their own penalty on top.
pub fn corporate_efficiency_step(
    config: &SimConfig,
    workforce: &Workforce,
    current_tick: u64,
    salary_shortfall: bool,
) -> Bps {
    let mut efficiency = workforce.corporate_efficiency_bps;
    if workforce.allocation.corporate_pct <= config.workforce.low_corporate_allocation_threshold_pct {
        efficiency = efficiency.saturating_sub(config.workforce.low_corporate_penalty_bps);
    } else {
        let headroom = 10_000u32.saturating_sub(efficiency);
        let scaled_recovery = (config.workforce.corporate_recovery_per_tick_at_100pct_bps as u64
            * workforce.allocation.corporate_pct as u64
            / 100) as u32;
        efficiency += scaled_recovery.min(headroom);
    }
    if current_tick <= workforce.hiring_shock_expires_tick {
        let shock = config
            .workforce
            .hiring_shock_per_capacity_bps
            .saturating_mul(workforce.pending_hiring_shock_capacity);
        efficiency = efficiency.saturating_sub(shock);
    }
    if salary_shortfall {
        efficiency = efficiency.saturating_sub(config.workforce.salary_shortfall_penalty_bps);
    }
    efficiency.min(10_000)
}

/// Duration/travel multiplier in bps for a given workforce function, derived
/// from the allocation percentage assigned to it, the company's corporate
/// efficiency score, and capped by the function's configured maximum bonus.
/// 10_000 bps means no change; lower values shorten durations (more workers
/// at full efficiency -> faster), matching the "higher allocation speeds
/// things up" framing. A company running at reduced corporate efficiency
/// realises a correspondingly smaller share of the bonus.
pub fn duration_multiplier_bps(
    config: &SimConfig,
    allocation: &WorkforceAllocation,
    function: WorkforceFunction,
    efficiency_bps: Bps,
) -> Bps {
    let (alloc_pct, max_bonus_bps) = match function {
        WorkforceFunction::Production => (
            allocation.operations_pct,
            config.duration_multipliers.production_max_speed_bonus_bps,
        ),
        WorkforceFunction::Research => (
            allocation.research_pct,
            config.duration_multipliers.research_max_speed_bonus_bps,
        ),
        WorkforceFunction::Logistics => (
            allocation.logistics_pct,
            config.duration_multipliers.logistics_max_travel_reduction_bps,
        ),
        WorkforceFunction::Corporate => return 10_000,
    };
    let bonus = (max_bonus_bps as u128 * alloc_pct as u128 * efficiency_bps as u128
        / (100 * 10_000)) as u32;
    10_000u32.saturating_sub(bonus.min(max_bonus_bps))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_capacity_change_rejects_over_absolute_cap() {
        let config = SimConfig::default();
        let over = config.workforce.max_absolute_capacity_delta_per_request as i64 + 1;
        assert!(validate_capacity_change(&config, 10_000, over).is_err());
    }

    #[test]
    fn validate_capacity_change_rejects_over_relative_cap() {
        let config = SimConfig::default();
        // 50% relative cap of a capacity of 10 is 5, but absolute cap is 250
        // so the relative cap is the binding constraint here.
        assert!(validate_capacity_change(&config, 10, 6).is_err());
        assert!(validate_capacity_change(&config, 10, 5).is_ok());
    }

    #[test]
    fn duration_multiplier_never_exceeds_configured_bonus() {
        let config = SimConfig::default();
        let full_allocation = WorkforceAllocation {
            operations_pct: 100,
            research_pct: 0,
            logistics_pct: 0,
            corporate_pct: 0,
        };
        let bps = duration_multiplier_bps(&config, &full_allocation, WorkforceFunction::Production, 10_000);
        assert_eq!(
            bps,
            10_000 - config.duration_multipliers.production_max_speed_bonus_bps
        );
    }

    #[test]
    fn duration_multiplier_scales_down_with_reduced_efficiency() {
        let config = SimConfig::default();
        let full_allocation = WorkforceAllocation {
            operations_pct: 100,
            research_pct: 0,
            logistics_pct: 0,
            corporate_pct: 0,
        };
        let at_half_efficiency =
            duration_multiplier_bps(&config, &full_allocation, WorkforceFunction::Production, 5_000);
        let at_full_efficiency =
            duration_multiplier_bps(&config, &full_allocation, WorkforceFunction::Production, 10_000);
        assert!(at_half_efficiency > at_full_efficiency);
    }

    #[test]
    fn corporate_efficiency_recovers_when_allocation_healthy() {
        let config = SimConfig::default();
        let mut workforce = Workforce::new(CompanyId::new(1), 100);
        workforce.corporate_efficiency_bps = 9_000;
        workforce.allocation.corporate_pct = 20;
        let next = corporate_efficiency_step(&config, &workforce, 0, false);
        assert!(next > 9_000);
    }

    #[test]
    fn corporate_efficiency_penalised_by_active_hiring_shock() {
        let config = SimConfig::default();
        let mut workforce = Workforce::new(CompanyId::new(1), 100);
        workforce.allocation.corporate_pct = 20;
        workforce.pending_hiring_shock_capacity = 50;
        workforce.hiring_shock_expires_tick = 10;
        let shocked = corporate_efficiency_step(&config, &workforce, 5, false);
        let unshocked = corporate_efficiency_step(&config, &workforce, 11, false);
        assert!(shocked < unshocked);
    }
}
