//! Core identifiers and value types shared across the simulation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer cents. Wide enough that `quantity * unitPriceCents` never overflows
/// even for the largest quantities the engine allows.
pub type Cents = i128;

/// Signed quantity of a good. Negative values never appear in committed state,
/// but intermediate arithmetic (deltas) is signed.
pub type Qty = i64;

/// Basis points, 1/10000.
pub type Bps = u32;

macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u64);

        impl $name {
            pub fn new(value: u64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(PlayerId);
define_id!(RegionId);
define_id!(CompanyId);
define_id!(ItemId);
define_id!(RecipeId);
define_id!(BuildingId);
define_id!(MarketOrderId);
define_id!(TradeId);
define_id!(ShipmentId);
define_id!(ProductionJobId);
define_id!(LedgerEntryId);
define_id!(WorkforceDeltaId);
define_id!(ContractId);

/// Key for the per-company, per-item, per-region inventory row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct InventoryKey {
    pub company_id: CompanyId,
    pub item_id: ItemId,
    pub region_id: RegionId,
}

impl InventoryKey {
    pub fn new(company_id: CompanyId, item_id: ItemId, region_id: RegionId) -> Self {
        Self {
            company_id,
            item_id,
            region_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Open,
    Filled,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipmentStatus {
    InTransit,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildingStatus {
    Active,
    Inactive,
    Construction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractStatus {
    Open,
    Accepted,
    Fulfilled,
    Cancelled,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingType {
    Mine,
    Farm,
    Factory,
    MegaFactory,
    Workshop,
    Warehouse,
    Headquarters,
    RndCenter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildingCategory {
    Production,
    Storage,
    Corporate,
}

impl BuildingType {
    pub fn category(self) -> BuildingCategory {
        match self {
            BuildingType::Mine
            | BuildingType::Farm
            | BuildingType::Factory
            | BuildingType::MegaFactory
            | BuildingType::Workshop => BuildingCategory::Production,
            BuildingType::Warehouse => BuildingCategory::Storage,
            BuildingType::Headquarters | BuildingType::RndCenter => BuildingCategory::Corporate,
        }
    }

    pub fn is_production(self) -> bool {
        self.category() == BuildingCategory::Production
    }
}

/// The function a workforce allocation bucket feeds into, used when deriving
/// duration/travel multipliers (see `workforce::duration_multiplier_bps`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkforceFunction {
    Production,
    Research,
    Logistics,
    Corporate,
}

/// Closed set of ledger entry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEntryType {
    OrderReserve,
    TradeSettlement,
    ProductionCompletion,
    ShipmentFee,
    BuildingAcquisition,
    BuildingOperatingCost,
    WorkforceRecruitmentExpense,
    WorkforceSalaryExpense,
    ContractSettlement,
}

/// What a ledger entry's `referenceId` points at, recorded alongside the
/// entry type so callers don't have to infer it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceType {
    MarketOrder,
    Trade,
    ProductionJob,
    Shipment,
    Building,
    WorkforceDelta,
    Contract,
}

/// Workforce allocation buckets, always summing to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkforceAllocation {
    pub operations_pct: u32,
    pub research_pct: u32,
    pub logistics_pct: u32,
    pub corporate_pct: u32,
}

impl WorkforceAllocation {
    pub fn sum(&self) -> u32 {
        self.operations_pct + self.research_pct + self.logistics_pct + self.corporate_pct
    }

    pub fn is_valid(&self) -> bool {
        self.sum() == 100
    }
}

impl Default for WorkforceAllocation {
    fn default() -> Self {
        Self {
            operations_pct: 70,
            research_pct: 10,
            logistics_pct: 10,
            corporate_pct: 10,
        }
    }
}

/// Wire encoding for `Cents`: a decimal string, since a `u128`/`i128` can
/// exceed what `f64`-backed JSON number parsers in other languages can
/// round-trip without loss. Apply with `#[serde(with = "crate::types::cents_as_string")]`.
pub mod cents_as_string {
    use super::Cents;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &Cents, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Cents, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<Cents>().map_err(D::Error::custom)
    }
}

/// `Option<Cents>` counterpart of [`cents_as_string`], for read models whose
/// money field may legitimately be absent (e.g. "no trade yet this window").
pub mod option_cents_as_string {
    use super::Cents;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &Option<Cents>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(cents) => serializer.serialize_str(&cents.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Cents>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| s.parse::<Cents>().map_err(D::Error::custom)).transpose()
    }
}
