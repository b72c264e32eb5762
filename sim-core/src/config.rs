//! Tunable simulation parameters. A single `SimConfig` is threaded
//! explicitly through every pass and command; there is no global/static
//! configuration, so tests can override any knob in isolation.

use std::collections::HashMap;

use crate::types::{Bps, Cents, ItemId, Qty};

#[derive(Debug, Clone)]
pub struct WorkforceConfig {
    pub hiring_delay_ticks: u64,
    pub base_salary_per_capacity_cents: Cents,
    pub recruitment_cost_per_capacity_cents: Cents,
    pub max_absolute_capacity_delta_per_request: u32,
    pub max_relative_capacity_delta_pct_per_request: u32,
    pub layoff_efficiency_penalty_bps: Bps,
    pub hiring_shock_duration_ticks: u64,
    pub hiring_shock_per_capacity_bps: Bps,
    pub low_corporate_allocation_threshold_pct: u32,
    pub low_corporate_penalty_bps: Bps,
    pub salary_shortfall_penalty_bps: Bps,
    pub corporate_recovery_per_tick_at_100pct_bps: Bps,
    /// Region code -> salary modifier in bps (10000 = no adjustment).
    pub region_salary_modifier_bps_by_code: HashMap<String, Bps>,
}

impl Default for WorkforceConfig {
    fn default() -> Self {
        Self {
            hiring_delay_ticks: 2,
            base_salary_per_capacity_cents: 2200,
            recruitment_cost_per_capacity_cents: 8500,
            max_absolute_capacity_delta_per_request: 250,
            max_relative_capacity_delta_pct_per_request: 50,
            layoff_efficiency_penalty_bps: 500,
            hiring_shock_duration_ticks: 2,
            hiring_shock_per_capacity_bps: 12,
            low_corporate_allocation_threshold_pct: 10,
            low_corporate_penalty_bps: 70,
            salary_shortfall_penalty_bps: 140,
            corporate_recovery_per_tick_at_100pct_bps: 120,
            region_salary_modifier_bps_by_code: HashMap::from([
                ("CORE".to_string(), 10_000),
                ("INDUSTRIAL".to_string(), 11_000),
                ("FRONTIER".to_string(), 9_500),
            ]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DurationMultiplierConfig {
    pub production_max_speed_bonus_bps: Bps,
    pub research_max_speed_bonus_bps: Bps,
    pub logistics_max_travel_reduction_bps: Bps,
}

impl Default for DurationMultiplierConfig {
    fn default() -> Self {
        Self {
            production_max_speed_bonus_bps: 1200,
            research_max_speed_bonus_bps: 1500,
            logistics_max_travel_reduction_bps: 1100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShipmentConfig {
    pub base_fee_cents: Cents,
    pub fee_per_unit_cents: Cents,
    /// Symmetric base travel ticks keyed by an unordered region-code pair.
    pub travel_ticks_by_region_codes: HashMap<(String, String), u64>,
}

impl Default for ShipmentConfig {
    fn default() -> Self {
        Self {
            base_fee_cents: 250,
            fee_per_unit_cents: 15,
            travel_ticks_by_region_codes: HashMap::from([
                (region_pair_key("CORE", "INDUSTRIAL"), 5),
                (region_pair_key("CORE", "FRONTIER"), 10),
                (region_pair_key("INDUSTRIAL", "FRONTIER"), 7),
            ]),
        }
    }
}

/// Canonical (sorted) key for a symmetric region-code pair lookup.
pub fn region_pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct BuildingConfig {
    pub operating_cost_interval_ticks: u64,
    pub base_storage_per_region: Qty,
    pub warehouse_capacity_per_slot: Qty,
}

impl Default for BuildingConfig {
    fn default() -> Self {
        Self {
            operating_cost_interval_ticks: 7,
            base_storage_per_region: 1000,
            warehouse_capacity_per_slot: 500,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub profit_threshold_cents: Cents,
    pub fallback_price_cents_by_item: HashMap<ItemId, Cents>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            profit_threshold_cents: 500,
            fallback_price_cents_by_item: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContractConfig {
    pub default_expiry_ticks: u64,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            default_expiry_ticks: 14,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TickRetryConfig {
    pub max_retry_attempts: u32,
    pub retry_base_delay_millis: u64,
}

impl Default for TickRetryConfig {
    fn default() -> Self {
        Self {
            max_retry_attempts: 5,
            retry_base_delay_millis: 20,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimConfig {
    pub workforce: WorkforceConfig,
    pub duration_multipliers: DurationMultiplierConfig,
    pub shipment: ShipmentConfig,
    pub buildings: BuildingConfig,
    pub bot: BotConfig,
    pub contract: ContractConfig,
    pub tick_retry: TickRetryConfig,
    /// When `true`, a company with fewer `CompanyRecipe` rows than the full
    /// recipe catalogue is treated as having every recipe unlocked (legacy
    /// compatibility). Default `false`: unlock state must be fully populated.
    pub company_recipe_legacy_fallback: bool,
}
