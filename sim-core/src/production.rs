//! Production jobs: the recipe-execution lifecycle, plus the bot
//! producer fallback pricing pass.

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::error::{DomainError, Result};
use crate::item::Recipe;
use crate::types::{BuildingId, Cents, CompanyId, ItemId, JobStatus, ProductionJobId, Qty};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionJob {
    pub id: ProductionJobId,
    pub company_id: CompanyId,
    pub building_id: BuildingId,
    pub recipe_id: crate::types::RecipeId,
    pub status: JobStatus,
    pub started_at_tick: u64,
    pub due_tick: u64,
    pub created_at: i64,
    /// Number of recipe executions this job represents. Scales input
    /// reservation and output quantity; duration is unaffected, since a run
    /// count is a batch size, not a speed multiplier.
    pub runs: u32,
}

/// How long a job actually takes once the workforce logistics/research
/// multiplier is applied: `ceil(base_duration_ticks * bps / 10_000)`,
/// floored at one tick so a large enough bonus can never make production
/// instantaneous.
pub fn effective_duration_ticks(base_duration_ticks: u64, duration_multiplier_bps: u32) -> u64 {
    let scaled = (base_duration_ticks as u128 * duration_multiplier_bps as u128).div_ceil(10_000);
    (scaled as u64).max(1)
}

/// Validate that a building can host a job for `recipe`: the building must be
/// active, of the recipe's required type, and (absent the legacy fallback)
/// the company must hold an unlocked `CompanyRecipe` row.
pub fn validate_job_start(
    building_type: crate::types::BuildingType,
    building_status: crate::types::BuildingStatus,
    recipe: &Recipe,
    recipe_unlocked: bool,
    legacy_fallback: bool,
) -> Result<()> {
    if building_status != crate::types::BuildingStatus::Active {
        return Err(DomainError::DomainInvariant(
            "building must be active to start production".into(),
        ));
    }
    if building_type != recipe.building_type {
        return Err(DomainError::DomainInvariant(format!(
            "recipe {} requires building type {:?}, got {:?}",
            recipe.code, recipe.building_type, building_type
        )));
    }
    if !recipe_unlocked && !legacy_fallback {
        return Err(DomainError::Forbidden(format!(
            "recipe {} is not unlocked for this company",
            recipe.code
        )));
    }
    Ok(())
}

pub fn validate_runs(runs: u32) -> Result<()> {
    if runs == 0 {
        return Err(DomainError::DomainInvariant(
            "a production job must request at least one run".into(),
        ));
    }
    Ok(())
}

pub fn complete_job(job: &mut ProductionJob) -> Result<()> {
    if job.status != JobStatus::InProgress {
        return Err(DomainError::DomainInvariant(
            "only an in-progress job can be completed".into(),
        ));
    }
    job.status = JobStatus::Completed;
    Ok(())
}

pub fn cancel_job(job: &mut ProductionJob) -> Result<()> {
    if job.status != JobStatus::InProgress {
        return Err(DomainError::DomainInvariant(
            "only an in-progress job can be cancelled".into(),
        ));
    }
    job.status = JobStatus::Cancelled;
    Ok(())
}

/// Decide whether a bot-controlled producer should place a sell order for
/// `item_id`, and at what price. Bots never read live order-book state: they
/// always compare their fixed fallback price against the recipe's implied
/// unit cost and only sell when the configured profit threshold is cleared,
/// making their behaviour fully deterministic and independent of tick order.
pub fn bot_sell_decision(
    config: &SimConfig,
    item_id: ItemId,
    unit_cost_cents: Cents,
) -> Option<Cents> {
    let fallback_price = *config.bot.fallback_price_cents_by_item.get(&item_id)?;
    if fallback_price - unit_cost_cents >= config.bot.profit_threshold_cents {
        Some(fallback_price)
    } else {
        None
    }
}

/// Unit cost of one output unit given a recipe's inputs priced at
/// `input_unit_costs_cents` (same order as `recipe.inputs`) and its output
/// quantity.
pub fn recipe_unit_cost_cents(recipe: &Recipe, input_unit_costs_cents: &[Cents]) -> Cents {
    let total_input_cost: Cents = recipe
        .inputs
        .iter()
        .zip(input_unit_costs_cents.iter())
        .map(|(input, unit_cost)| input.quantity as Cents * unit_cost)
        .sum();
    let output_qty: Qty = recipe.outputs.iter().map(|o| o.quantity).sum();
    if output_qty == 0 {
        return total_input_cost;
    }
    total_input_cost / output_qty as Cents
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{RecipeInput, RecipeOutput};
    use crate::types::{BuildingStatus, BuildingType, RecipeId};

    fn recipe() -> Recipe {
        Recipe {
            id: RecipeId::new(1),
            code: "smelt".to_string(),
            building_type: BuildingType::Factory,
            inputs: vec![RecipeInput {
                item_id: ItemId::new(1),
                quantity: 2,
            }],
            outputs: vec![RecipeOutput {
                item_id: ItemId::new(2),
                quantity: 1,
            }],
            base_duration_ticks: 4,
        }
    }

    #[test]
    fn effective_duration_rounds_up_and_floors_at_one() {
        assert_eq!(effective_duration_ticks(4, 9_000), 4);
        assert_eq!(effective_duration_ticks(4, 8_800), 4);
        assert_eq!(effective_duration_ticks(1, 100), 1);
    }

    #[test]
    fn validate_job_start_rejects_wrong_building_type() {
        let r = recipe();
        let err = validate_job_start(
            BuildingType::Mine,
            BuildingStatus::Active,
            &r,
            true,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::DomainInvariant(_)));
    }

    #[test]
    fn validate_job_start_honours_legacy_fallback() {
        let r = recipe();
        assert!(validate_job_start(BuildingType::Factory, BuildingStatus::Active, &r, false, false).is_err());
        assert!(validate_job_start(BuildingType::Factory, BuildingStatus::Active, &r, false, true).is_ok());
    }

    #[test]
    fn bot_sell_decision_requires_threshold() {
        let mut config = SimConfig::default();
        config.bot.profit_threshold_cents = 500;
        config.bot.fallback_price_cents_by_item.insert(ItemId::new(1), 1000);
        assert_eq!(bot_sell_decision(&config, ItemId::new(1), 600), Some(1000));
        assert_eq!(bot_sell_decision(&config, ItemId::new(1), 600 + 1), None);
        assert_eq!(bot_sell_decision(&config, ItemId::new(2), 100), None);
    }

    #[test]
    fn recipe_unit_cost_divides_by_output_quantity() {
        let r = recipe();
        assert_eq!(recipe_unit_cost_cents(&r, &[50]), 100);
    }

    #[test]
    fn validate_runs_rejects_zero() {
        assert!(validate_runs(0).is_err());
        assert!(validate_runs(1).is_ok());
    }
}
