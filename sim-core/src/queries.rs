//! Read models. Every function here is a pure projection over
//! `&World`: none of them mutate, and none of them are subject to the
//! optimistic-lock retry loop commands use.

use serde::{Deserialize, Serialize};

use crate::building::Building;
use crate::company::Company;
use crate::contract::Contract;
use crate::error::{DomainError, Result};
use crate::inventory::InventoryRow;
use crate::item::{Item, Recipe};
use crate::ledger::{LedgerCursor, LedgerEntry};
use crate::market::{Candle, MarketOrder, Trade};
use crate::production::ProductionJob;
use crate::shipment::Shipment;
use crate::types::{Cents, CompanyId, ItemId, RegionId};
use crate::world::World;

pub fn list_companies(world: &World) -> Vec<&Company> {
    let mut companies: Vec<&Company> = world.companies.values().collect();
    companies.sort_by_key(|c| c.id);
    companies
}

pub fn get_company(world: &World, company_id: CompanyId) -> Result<&Company> {
    world
        .companies
        .get(&company_id)
        .ok_or_else(|| DomainError::NotFound(format!("company {company_id}")))
}

pub fn list_company_inventory(world: &World, company_id: CompanyId) -> Vec<&InventoryRow> {
    let mut rows: Vec<&InventoryRow> = world
        .inventories
        .values()
        .filter(|row| row.key.company_id == company_id)
        .collect();
    rows.sort_by_key(|row| (row.key.item_id, row.key.region_id));
    rows
}

pub fn list_market_orders(world: &World, item_id: ItemId, region_id: RegionId) -> Vec<&MarketOrder> {
    let mut orders: Vec<&MarketOrder> = world
        .market_orders
        .values()
        .filter(|o| o.item_id == item_id && o.region_id == region_id)
        .collect();
    orders.sort_by_key(crate::market::price_time_key);
    orders
}

pub fn list_market_candles(world: &World, item_id: ItemId, region_id: RegionId) -> Vec<&Candle> {
    let mut candles: Vec<&Candle> = world
        .candles
        .iter()
        .filter(|c| c.item_id == item_id && c.region_id == region_id)
        .collect();
    candles.sort_by_key(|c| c.tick);
    candles
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketAnalyticsSummary {
    pub item_id: ItemId,
    pub region_id: RegionId,
    #[serde(with = "crate::types::option_cents_as_string")]
    pub last_trade_price_cents: Option<Cents>,
    pub open_buy_count: usize,
    pub open_sell_count: usize,
}

pub fn get_market_analytics_summary(
    world: &World,
    item_id: ItemId,
    region_id: RegionId,
) -> MarketAnalyticsSummary {
    let candles = list_market_candles(world, item_id, region_id);
    let orders = list_market_orders(world, item_id, region_id);
    MarketAnalyticsSummary {
        item_id,
        region_id,
        last_trade_price_cents: candles.last().map(|c| c.close_cents),
        open_buy_count: orders
            .iter()
            .filter(|o| o.is_open() && o.side == crate::types::Side::Buy)
            .count(),
        open_sell_count: orders
            .iter()
            .filter(|o| o.is_open() && o.side == crate::types::Side::Sell)
            .count(),
    }
}

pub fn list_items(world: &World) -> &[Item] {
    &world.items
}

pub fn list_recipes(world: &World) -> &[Recipe] {
    &world.recipes
}

pub fn list_production_jobs(world: &World, company_id: CompanyId) -> Vec<&ProductionJob> {
    let mut jobs: Vec<&ProductionJob> = world
        .production_jobs
        .values()
        .filter(|j| j.company_id == company_id)
        .collect();
    jobs.sort_by_key(|j| (j.due_tick, j.created_at, j.id.0));
    jobs
}

pub fn list_shipments(world: &World, company_id: CompanyId) -> Vec<&Shipment> {
    let mut shipments: Vec<&Shipment> = world
        .shipments
        .values()
        .filter(|s| s.company_id == company_id)
        .collect();
    shipments.sort_by_key(|s| (s.tick_arrives, s.created_at, s.id.0));
    shipments
}

pub fn get_company_ledger(
    world: &World,
    company_id: CompanyId,
    after: Option<&str>,
    limit: usize,
) -> Result<(Vec<LedgerEntry>, Option<String>)> {
    let cursor = after.map(LedgerCursor::decode).transpose()?;
    let (page, next) = world.ledger.page_for_company(company_id, cursor, limit);
    Ok((page, next.map(|c| c.encode())))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinanceSummary {
    #[serde(with = "crate::types::cents_as_string")]
    pub cash_cents: Cents,
    #[serde(with = "crate::types::cents_as_string")]
    pub reserved_cash_cents: Cents,
    #[serde(with = "crate::types::cents_as_string")]
    pub available_cash_cents: Cents,
}

pub fn get_finance_summary(world: &World, company_id: CompanyId) -> Result<FinanceSummary> {
    let company = get_company(world, company_id)?;
    Ok(FinanceSummary {
        cash_cents: company.cash_cents,
        reserved_cash_cents: company.reserved_cash_cents,
        available_cash_cents: company.available_cash_cents(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationHealth {
    pub tick: u64,
    pub lock_version: u64,
    pub company_count: usize,
    pub open_order_count: usize,
}

pub fn get_simulation_health(world: &World) -> SimulationHealth {
    SimulationHealth {
        tick: world.tick,
        lock_version: world.lock_version,
        company_count: world.companies.len(),
        open_order_count: world.market_orders.values().filter(|o| o.is_open()).count(),
    }
}

pub fn get_buildings_for_company(world: &World, company_id: CompanyId) -> Vec<&Building> {
    let mut buildings: Vec<&Building> = world
        .buildings
        .values()
        .filter(|b| b.company_id == company_id)
        .collect();
    buildings.sort_by_key(|b| b.id);
    buildings
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionalStorageInfo {
    pub region_id: RegionId,
    pub used: i64,
    pub capacity: i64,
}

pub fn get_regional_storage_info(
    world: &World,
    company_id: CompanyId,
    region_id: RegionId,
) -> RegionalStorageInfo {
    let used: i64 = world
        .inventories
        .values()
        .filter(|row| row.key.company_id == company_id && row.key.region_id == region_id)
        .map(|row| row.quantity)
        .sum();
    let active_warehouse_slots: u32 = world
        .buildings
        .values()
        .filter(|b| {
            b.company_id == company_id
                && b.region_id == region_id
                && b.building_type == crate::types::BuildingType::Warehouse
                && b.status == crate::types::BuildingStatus::Active
        })
        .map(|b| b.capacity_slots)
        .sum();
    let capacity = crate::building::regional_storage_capacity(&world.config, active_warehouse_slots);
    RegionalStorageInfo {
        region_id,
        used,
        capacity,
    }
}

pub fn list_market_trades(world: &World, item_id: ItemId, region_id: RegionId) -> Vec<&Trade> {
    let mut trades: Vec<&Trade> = world
        .trades
        .iter()
        .filter(|t| t.item_id == item_id && t.region_id == region_id)
        .collect();
    trades.sort_by_key(|t| t.id.0);
    trades
}

pub fn list_contracts(world: &World, item_id: ItemId, region_id: RegionId) -> Vec<&Contract> {
    let mut contracts: Vec<&Contract> = world
        .contracts
        .values()
        .filter(|c| c.item_id == item_id && c.region_id == region_id)
        .collect();
    contracts.sort_by_key(|c| c.id);
    contracts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

    #[test]
    fn get_company_returns_not_found_for_unknown_id() {
        let world = World::new(SimConfig::default());
        assert!(get_company(&world, CompanyId::new(999)).is_err());
    }

    #[test]
    fn get_simulation_health_reflects_company_count() {
        let mut world = World::new(SimConfig::default());
        let player = world.resolve_or_create_player("ext-1");
        let region_id = world.regions[0].id;
        world.create_company(player, region_id, "Acme", 1000).unwrap();
        let health = get_simulation_health(&world);
        assert_eq!(health.company_count, 1);
    }
}
