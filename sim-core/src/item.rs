//! Items and recipes: the fixed production catalogue.

use serde::{Deserialize, Serialize};

use crate::types::{ItemId, RecipeId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeInput {
    pub item_id: ItemId,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeOutput {
    pub item_id: ItemId,
    pub quantity: i64,
}

/// A production recipe: a fixed set of inputs consumed and outputs produced
/// over `base_duration_ticks`, gated to a single `BuildingType`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub code: String,
    pub building_type: crate::types::BuildingType,
    pub inputs: Vec<RecipeInput>,
    pub outputs: Vec<RecipeOutput>,
    pub base_duration_ticks: u64,
}

/// Unlock state of a recipe for a given company, the gate `createProductionJob`
/// consults before allowing a job to start. The
/// `companyRecipeLegacyFallback` config flag lets pre-existing companies that
/// predate per-recipe unlocking run any recipe for their building type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRecipe {
    pub company_id: crate::types::CompanyId,
    pub recipe_id: RecipeId,
    pub unlocked: bool,
}
