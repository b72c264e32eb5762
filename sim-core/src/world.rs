//! World: the complete simulation state container and the home of every
//! state-mutating command. `World` itself plays the role of an in-memory
//! transaction: every command takes `&mut World`, reads whatever rows it
//! needs, and either commits a fully invariant-checked new state or leaves
//! the world untouched and returns an error.

use std::collections::HashMap;

use crate::building::{self, Building};
use crate::company::Company;
use crate::config::SimConfig;
use crate::contract::{self, Contract};
use crate::error::{DomainError, Result};
use crate::inventory::InventoryRow;
use crate::item::{CompanyRecipe, Item, Recipe};
use crate::ledger::{Ledger, LedgerEntry};
use crate::market::order::MarketOrder;
use crate::market::{self, Candle};
use crate::player::{self, Player};
use crate::production::{self, ProductionJob};
use crate::region::{self, Region};
use crate::reservation;
use crate::shipment::{self, Shipment};
use crate::types::{
    BuildingId, Cents, CompanyId, ContractId, InventoryKey, ItemId, JobStatus, LedgerEntryId,
    LedgerEntryType, MarketOrderId, OrderStatus, PlayerId, ProductionJobId, Qty, RecipeId,
    ReferenceType, RegionId, Side, ShipmentId, ShipmentStatus, WorkforceDeltaId, WorkforceFunction,
};
use crate::workforce::{self, Workforce, WorkforceDelta};

#[derive(Debug, Default)]
struct IdCounters {
    player: u64,
    company: u64,
    building: u64,
    market_order: u64,
    trade: u64,
    shipment: u64,
    production_job: u64,
    ledger_entry: u64,
    workforce_delta: u64,
    contract: u64,
}

/// Complete state of the simulation at a tick boundary.
#[derive(Debug)]
pub struct World {
    pub config: SimConfig,
    pub tick: u64,
    /// Bumped on every successfully committed command; read by callers
    /// driving the tick loop as the world-level optimistic-concurrency token.
    pub lock_version: u64,

    pub regions: Vec<Region>,
    pub items: Vec<Item>,
    pub recipes: Vec<Recipe>,
    pub company_recipes: Vec<CompanyRecipe>,

    pub players: Vec<Player>,
    pub companies: HashMap<CompanyId, Company>,
    pub buildings: HashMap<BuildingId, Building>,
    pub inventories: HashMap<InventoryKey, InventoryRow>,
    pub workforces: HashMap<CompanyId, Workforce>,
    pub workforce_deltas: Vec<WorkforceDelta>,

    pub market_orders: HashMap<MarketOrderId, MarketOrder>,
    pub trades: Vec<market::Trade>,
    pub candles: Vec<Candle>,
    pub shipments: HashMap<ShipmentId, Shipment>,
    pub production_jobs: HashMap<ProductionJobId, ProductionJob>,
    pub contracts: HashMap<ContractId, Contract>,

    pub ledger: Ledger,

    next_id: IdCounters,
    next_created_at: i64,
}

impl World {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            tick: 0,
            lock_version: 0,
            regions: region::seed_regions(),
            items: Vec::new(),
            recipes: Vec::new(),
            company_recipes: Vec::new(),
            players: Vec::new(),
            companies: HashMap::new(),
            buildings: HashMap::new(),
            inventories: HashMap::new(),
            workforces: HashMap::new(),
            workforce_deltas: Vec::new(),
            market_orders: HashMap::new(),
            trades: Vec::new(),
            candles: Vec::new(),
            shipments: HashMap::new(),
            production_jobs: HashMap::new(),
            contracts: HashMap::new(),
            ledger: Ledger::new(),
            next_id: IdCounters::default(),
            next_created_at: 0,
        }
    }

    /// Monotonic logical clock standing in for wall time: every row created
    /// gets the next value, so `(createdAt, id)` ordering is reproducible
    /// without depending on the real clock.
    fn tick_clock(&mut self) -> i64 {
        let value = self.next_created_at;
        self.next_created_at += 1;
        value
    }

    fn region_by_id(&self, id: RegionId) -> Result<&Region> {
        self.regions
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| DomainError::NotFound(format!("region {id}")))
    }

    fn recipe_by_id(&self, id: RecipeId) -> Result<&Recipe> {
        self.recipes
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| DomainError::NotFound(format!("recipe {id}")))
    }

    fn company_mut(&mut self, id: CompanyId) -> Result<&mut Company> {
        self.companies
            .get_mut(&id)
            .ok_or_else(|| DomainError::NotFound(format!("company {id}")))
    }

    fn home_region_of(&self, company_id: CompanyId) -> Result<RegionId> {
        self.companies
            .get(&company_id)
            .map(|c| c.home_region_id)
            .ok_or_else(|| DomainError::NotFound(format!("company {company_id}")))
    }

    fn inventory_row_mut(&mut self, key: InventoryKey) -> &mut InventoryRow {
        self.inventories
            .entry(key)
            .or_insert_with(|| InventoryRow::new(key))
    }

    /// Append a ledger entry. Callers are responsible for having already
    /// applied the corresponding balance mutation via the reservation
    /// algebra; `balance_after_cents` should reflect `cashCents` as it stands
    /// once that mutation has landed.
    #[allow(clippy::too_many_arguments)]
    fn append_ledger_entry(
        &mut self,
        company_id: CompanyId,
        region_id: Option<RegionId>,
        entry_type: LedgerEntryType,
        amount_cents: Cents,
        delta_reserved_cash_cents: Cents,
        balance_after_cents: Cents,
        reference_type: ReferenceType,
        reference_id: u64,
    ) {
        let id = LedgerEntryId::new(self.next_id.ledger_entry);
        self.next_id.ledger_entry += 1;
        let created_at = self.tick_clock();
        self.ledger.append(LedgerEntry {
            id,
            company_id,
            region_id,
            entry_type,
            amount_cents,
            delta_reserved_cash_cents,
            balance_after_cents,
            reference_type,
            reference_id,
            tick: self.tick,
            created_at,
        });
    }

    // ---------------------------------------------------------------
    // Players / Companies
    // ---------------------------------------------------------------

    pub fn resolve_or_create_player(&mut self, external_ref: &str) -> PlayerId {
        player::resolve_or_create(&mut self.players, &mut self.next_id.player, external_ref)
    }

    pub fn create_company(
        &mut self,
        owner_id: PlayerId,
        home_region_id: RegionId,
        name: &str,
        starting_cash_cents: Cents,
    ) -> Result<CompanyId> {
        self.region_by_id(home_region_id)?;
        let id = CompanyId::new(self.next_id.company);
        self.next_id.company += 1;
        let company = Company::new(id, owner_id, home_region_id, name, starting_cash_cents);
        self.companies.insert(id, company);
        self.workforces.insert(id, Workforce::new(id, 0));
        Ok(id)
    }

    // ---------------------------------------------------------------
    // Buildings
    // ---------------------------------------------------------------

    pub fn acquire_building(
        &mut self,
        company_id: CompanyId,
        region_id: RegionId,
        building_type: crate::types::BuildingType,
        acquisition_cost_cents: Cents,
        weekly_operating_cost_cents: Cents,
        capacity_slots: u32,
    ) -> Result<BuildingId> {
        self.region_by_id(region_id)?;
        let company = self.company_mut(company_id)?;
        let next_state = reservation::debit_cash(company.cash_state(), acquisition_cost_cents)?;
        company.apply_cash_state(next_state);
        let balance_after = self.companies[&company_id].cash_cents;

        let id = BuildingId::new(self.next_id.building);
        self.next_id.building += 1;
        let building = Building::new(
            id,
            company_id,
            region_id,
            building_type,
            self.tick,
            acquisition_cost_cents,
            weekly_operating_cost_cents,
            capacity_slots,
        );
        self.buildings.insert(id, building);

        self.append_ledger_entry(
            company_id,
            Some(region_id),
            LedgerEntryType::BuildingAcquisition,
            -acquisition_cost_cents,
            0,
            balance_after,
            ReferenceType::Building,
            id.0,
        );
        Ok(id)
    }

    /// Sweep every active building due for its operating-cost charge this
    /// tick, deactivating any whose owner can no longer afford it rather than
    /// letting the company go cash-negative.
    pub fn sweep_operating_costs(&mut self) {
        let due: Vec<BuildingId> = self
            .buildings
            .values()
            .filter(|b| b.is_due_for_operating_cost(self.tick, &self.config))
            .map(|b| b.id)
            .collect();

        for building_id in due {
            let (company_id, region_id, cost_cents) = {
                let b = &self.buildings[&building_id];
                (b.company_id, b.region_id, b.weekly_operating_cost_cents)
            };
            let Some(company) = self.companies.get(&company_id) else {
                continue;
            };
            let charged = match reservation::debit_cash(company.cash_state(), cost_cents) {
                Ok(next_state) => {
                    self.companies.get_mut(&company_id).unwrap().apply_cash_state(next_state);
                    true
                }
                Err(_) => {
                    self.buildings.get_mut(&building_id).unwrap().deactivate();
                    false
                }
            };
            if charged {
                let balance_after = self.companies[&company_id].cash_cents;
                self.append_ledger_entry(
                    company_id,
                    Some(region_id),
                    LedgerEntryType::BuildingOperatingCost,
                    -cost_cents,
                    0,
                    balance_after,
                    ReferenceType::Building,
                    building_id.0,
                );
                self.buildings.get_mut(&building_id).unwrap().last_operating_cost_tick = self.tick;
            }
        }
    }

    // ---------------------------------------------------------------
    // Market orders
    // ---------------------------------------------------------------

    /// Place an order in the requesting company's home region. Orders rest
    /// on the book, open, until the next tick's matching pass runs; placing
    /// an order never settles a trade synchronously.
    pub fn place_order(
        &mut self,
        company_id: CompanyId,
        item_id: ItemId,
        side: Side,
        limit_price_cents: Cents,
        quantity: Qty,
    ) -> Result<MarketOrderId> {
        let region_id = self.home_region_of(company_id)?;

        let reserved_cash_delta = match side {
            Side::Buy => {
                let reserve = quantity as Cents * limit_price_cents;
                let company = self.company_mut(company_id)?;
                let next_state =
                    reservation::reserve_cash_for_buy(company.cash_state(), quantity, limit_price_cents)?;
                company.apply_cash_state(next_state);
                reserve
            }
            Side::Sell => {
                let key = InventoryKey::new(company_id, item_id, region_id);
                let row = self.inventory_row_mut(key);
                let next_state = reservation::reserve_inventory_for_sell(row.state(), quantity)?;
                row.apply_state(next_state);
                0
            }
        };

        let id = MarketOrderId::new(self.next_id.market_order);
        self.next_id.market_order += 1;
        let created_at = self.tick_clock();
        let order = MarketOrder {
            id,
            company_id,
            item_id,
            region_id,
            side,
            limit_price_cents,
            quantity,
            filled_quantity: 0,
            status: OrderStatus::Open,
            tick_placed: self.tick,
            created_at,
        };
        self.market_orders.insert(id, order);

        let balance_after = self.companies[&company_id].cash_cents;
        self.append_ledger_entry(
            company_id,
            Some(region_id),
            LedgerEntryType::OrderReserve,
            0,
            reserved_cash_delta,
            balance_after,
            ReferenceType::MarketOrder,
            id.0,
        );

        self.lock_version += 1;
        Ok(id)
    }

    pub fn cancel_order(&mut self, order_id: MarketOrderId, requester_company_id: CompanyId) -> Result<()> {
        let order = self
            .market_orders
            .get(&order_id)
            .ok_or_else(|| DomainError::NotFound(format!("market order {order_id}")))?;
        if order.company_id != requester_company_id {
            return Err(DomainError::Forbidden(
                "only the placing company can cancel an order".into(),
            ));
        }
        if !order.is_open() {
            return Err(DomainError::DomainInvariant(
                "only an open order can be cancelled".into(),
            ));
        }
        let remaining = order.remaining_quantity();
        let (company_id, item_id, region_id, side, limit_price_cents) =
            (order.company_id, order.item_id, order.region_id, order.side, order.limit_price_cents);

        match side {
            Side::Buy => {
                let release_amount = remaining * limit_price_cents;
                let company = self.company_mut(company_id)?;
                let next_state = reservation::release_cash(company.cash_state(), release_amount)?;
                company.apply_cash_state(next_state);
                let balance_after = self.companies[&company_id].cash_cents;
                self.append_ledger_entry(
                    company_id,
                    Some(region_id),
                    LedgerEntryType::OrderReserve,
                    0,
                    -release_amount,
                    balance_after,
                    ReferenceType::MarketOrder,
                    order_id.0,
                );
            }
            Side::Sell => {
                let key = InventoryKey::new(company_id, item_id, region_id);
                let row = self.inventory_row_mut(key);
                let next_state = reservation::release_inventory(row.state(), remaining)?;
                row.apply_state(next_state);
                let balance_after = self.companies[&company_id].cash_cents;
                self.append_ledger_entry(
                    company_id,
                    Some(region_id),
                    LedgerEntryType::OrderReserve,
                    0,
                    0,
                    balance_after,
                    ReferenceType::MarketOrder,
                    order_id.0,
                );
            }
        }

        self.market_orders.get_mut(&order_id).unwrap().status = OrderStatus::Cancelled;
        self.lock_version += 1;
        Ok(())
    }

    /// Match every open order against the book, once per tick. Orders placed
    /// during a tick rest until this pass runs; groups are processed in
    /// `(regionId, itemId)` order and, within a group, orders are walked in
    /// `(tickPlaced, createdAt, id)` arrival order against whatever is
    /// already resting.
    pub fn run_matching_pass(&mut self) {
        let mut ids: Vec<MarketOrderId> = self
            .market_orders
            .values()
            .filter(|o| o.is_open())
            .map(|o| o.id)
            .collect();
        ids.sort_by_key(|id| {
            let o = &self.market_orders[id];
            (o.region_id, o.item_id, market::price_time_key(o))
        });

        for order_id in ids {
            self.match_order_against_book(order_id);
        }
    }

    /// Match a single resting order against the rest of the open book and
    /// settle every resulting trade atomically.
    fn match_order_against_book(&mut self, order_id: MarketOrderId) {
        let Some(incoming) = self.market_orders.get(&order_id).copied() else {
            return;
        };
        if !incoming.is_open() {
            return;
        }
        let resting: Vec<MarketOrder> = self
            .market_orders
            .values()
            .filter(|o| o.id != order_id && o.is_open())
            .copied()
            .collect();

        let mut next_trade_id = self.next_id.trade;
        let (trades, incoming_filled, fills) =
            market::match_incoming_order(&incoming, &resting, self.tick, || {
                let id = crate::types::TradeId::new(next_trade_id);
                next_trade_id += 1;
                id
            });
        self.next_id.trade = next_trade_id;

        if trades.is_empty() {
            return;
        }

        let mut incoming = incoming;
        incoming.filled_quantity += incoming_filled;
        if incoming.remaining_quantity() == 0 {
            incoming.status = OrderStatus::Filled;
        }
        self.market_orders.insert(order_id, incoming);

        for (resting_id, fill_qty) in &fills {
            let resting_order = self.market_orders.get_mut(resting_id).unwrap();
            resting_order.filled_quantity += fill_qty;
            if resting_order.remaining_quantity() == 0 {
                resting_order.status = OrderStatus::Filled;
            }
        }

        for trade in &trades {
            self.settle_trade(*trade);
            self.trades.push(*trade);
        }

        self.rebuild_candle(incoming.item_id, incoming.region_id, &trades);
        self.lock_version += 1;
    }

    fn settle_trade(&mut self, trade: market::Trade) {
        let notional = trade.price_cents * trade.quantity as Cents;
        let buy_order = self.market_orders[&trade.buy_order_id];
        let sell_order = self.market_orders[&trade.sell_order_id];

        let buyer_reserved = trade.quantity as Cents * buy_order.limit_price_cents;
        if let Some(company) = self.companies.get(&buy_order.company_id) {
            let next_state = reservation::settle_cash(company.cash_state(), buyer_reserved, notional)
                .expect("settlement never exceeds a valid reservation");
            self.companies.get_mut(&buy_order.company_id).unwrap().apply_cash_state(next_state);
        }
        let buyer_balance_after = self.companies.get(&buy_order.company_id).map(|c| c.cash_cents).unwrap_or(0);

        if let Some(company) = self.companies.get(&sell_order.company_id) {
            let next_state = reservation::credit_cash(company.cash_state(), notional)
                .expect("crediting cash never violates an invariant");
            self.companies.get_mut(&sell_order.company_id).unwrap().apply_cash_state(next_state);
        }
        let seller_balance_after = self.companies.get(&sell_order.company_id).map(|c| c.cash_cents).unwrap_or(0);

        let buy_key = InventoryKey::new(buy_order.company_id, buy_order.item_id, buy_order.region_id);
        let buy_row = self.inventory_row_mut(buy_key);
        let buy_state = reservation::add_inventory(buy_row.state(), trade.quantity)
            .expect("crediting inventory never violates an invariant");
        buy_row.apply_state(buy_state);

        let sell_key = InventoryKey::new(sell_order.company_id, sell_order.item_id, sell_order.region_id);
        let sell_row = self.inventory_row_mut(sell_key);
        let sell_state = reservation::consume_inventory(sell_row.state(), trade.quantity)
            .expect("consuming reserved inventory never violates an invariant");
        sell_row.apply_state(sell_state);

        self.append_ledger_entry(
            buy_order.company_id,
            Some(buy_order.region_id),
            LedgerEntryType::TradeSettlement,
            -notional,
            -buyer_reserved,
            buyer_balance_after,
            ReferenceType::Trade,
            trade.id.0,
        );
        self.append_ledger_entry(
            sell_order.company_id,
            Some(sell_order.region_id),
            LedgerEntryType::TradeSettlement,
            notional,
            0,
            seller_balance_after,
            ReferenceType::Trade,
            trade.id.0,
        );
    }

    fn rebuild_candle(&mut self, item_id: ItemId, region_id: RegionId, new_trades: &[market::Trade]) {
        if let Some(candle) = market::build_candle(item_id, region_id, self.tick, new_trades) {
            if let Some(existing) = self
                .candles
                .iter_mut()
                .find(|c| c.item_id == item_id && c.region_id == region_id && c.tick == self.tick)
            {
                existing.high_cents = existing.high_cents.max(candle.high_cents);
                existing.low_cents = existing.low_cents.min(candle.low_cents);
                existing.close_cents = candle.close_cents;
                let prior_volume = existing.volume;
                let combined_notional =
                    existing.vwap_cents * prior_volume as Cents + candle.vwap_cents * candle.volume as Cents;
                existing.volume += candle.volume;
                existing.vwap_cents = if existing.volume == 0 {
                    0
                } else {
                    combined_notional / existing.volume as Cents
                };
                existing.trade_count += candle.trade_count;
            } else {
                self.candles.push(candle);
            }
        }
    }

    // ---------------------------------------------------------------
    // Production
    // ---------------------------------------------------------------

    pub fn create_production_job(
        &mut self,
        company_id: CompanyId,
        building_id: BuildingId,
        recipe_id: RecipeId,
        runs: u32,
    ) -> Result<ProductionJobId> {
        production::validate_runs(runs)?;
        let building: Building = *self
            .buildings
            .get(&building_id)
            .ok_or_else(|| DomainError::NotFound(format!("building {building_id}")))?;
        if building.company_id != company_id {
            return Err(DomainError::Forbidden(
                "building is not owned by this company".into(),
            ));
        }
        let recipe = self.recipe_by_id(recipe_id)?.clone();
        let unlocked = self.is_recipe_unlocked(company_id, recipe_id);
        production::validate_job_start(
            building.building_type,
            building.status,
            &recipe,
            unlocked,
            self.config.company_recipe_legacy_fallback,
        )?;

        for input in &recipe.inputs {
            let key = InventoryKey::new(company_id, input.item_id, building.region_id);
            let row = self.inventory_row_mut(key);
            let next_state = reservation::remove_inventory(row.state(), input.quantity * runs as Qty)?;
            row.apply_state(next_state);
        }

        let duration_multiplier = workforce::duration_multiplier_bps(
            &self.config,
            &self.workforces[&company_id].allocation,
            WorkforceFunction::Production,
            self.workforces[&company_id].corporate_efficiency_bps,
        );
        let duration = production::effective_duration_ticks(recipe.base_duration_ticks, duration_multiplier);

        let id = ProductionJobId::new(self.next_id.production_job);
        self.next_id.production_job += 1;
        let created_at = self.tick_clock();
        let job = ProductionJob {
            id,
            company_id,
            building_id,
            recipe_id,
            status: JobStatus::InProgress,
            started_at_tick: self.tick,
            due_tick: self.tick + duration,
            created_at,
            runs,
        };
        self.production_jobs.insert(id, job);
        Ok(id)
    }

    /// Complete every job due this tick, in `(dueTick, createdAt, id)` order,
    /// crediting `runs`-scaled outputs to the owning company's regional
    /// inventory.
    pub fn complete_due_production_jobs(&mut self) {
        let mut due: Vec<ProductionJobId> = self
            .production_jobs
            .values()
            .filter(|j| j.status == JobStatus::InProgress && j.due_tick <= self.tick)
            .map(|j| j.id)
            .collect();
        due.sort_by_key(|id| {
            let j = &self.production_jobs[id];
            (j.due_tick, j.created_at, j.id.0)
        });

        for job_id in due {
            let (company_id, building_region, recipe_id, runs) = {
                let job = &self.production_jobs[&job_id];
                let building = &self.buildings[&job.building_id];
                (job.company_id, building.region_id, job.recipe_id, job.runs)
            };
            let recipe = self.recipe_by_id(recipe_id).unwrap().clone();
            for output in &recipe.outputs {
                let key = InventoryKey::new(company_id, output.item_id, building_region);
                let row = self.inventory_row_mut(key);
                let next_state =
                    reservation::add_inventory(row.state(), output.quantity * runs as Qty).unwrap();
                row.apply_state(next_state);
            }
            production::complete_job(self.production_jobs.get_mut(&job_id).unwrap()).unwrap();
            let balance_after = self.companies.get(&company_id).map(|c| c.cash_cents).unwrap_or(0);
            self.append_ledger_entry(
                company_id,
                Some(building_region),
                LedgerEntryType::ProductionCompletion,
                0,
                0,
                balance_after,
                ReferenceType::ProductionJob,
                job_id.0,
            );
        }
    }

    fn is_recipe_unlocked(&self, company_id: CompanyId, recipe_id: RecipeId) -> bool {
        self.company_recipes
            .iter()
            .find(|cr| cr.company_id == company_id && cr.recipe_id == recipe_id)
            .map(|cr| cr.unlocked)
            .unwrap_or(false)
    }

    // ---------------------------------------------------------------
    // Shipments
    // ---------------------------------------------------------------

    /// Ship goods out of the company's home region. The origin is always the
    /// company's home region; the destination must differ from it.
    pub fn create_shipment(
        &mut self,
        company_id: CompanyId,
        item_id: ItemId,
        destination_region_id: RegionId,
        quantity: Qty,
    ) -> Result<ShipmentId> {
        let origin_region_id = self.home_region_of(company_id)?;
        if destination_region_id == origin_region_id {
            return Err(DomainError::DomainInvariant(
                "shipment destination must differ from the company's home region".into(),
            ));
        }
        let origin = self.region_by_id(origin_region_id)?.clone();
        let destination = self.region_by_id(destination_region_id)?.clone();
        let fee = shipment::shipment_fee_cents(&self.config, quantity);

        let key = InventoryKey::new(company_id, item_id, origin_region_id);
        let row = self.inventory_row_mut(key);
        let next_inventory = reservation::remove_inventory(row.state(), quantity)?;
        row.apply_state(next_inventory);

        let company = self.company_mut(company_id)?;
        let next_cash = reservation::debit_cash(company.cash_state(), fee)?;
        company.apply_cash_state(next_cash);
        let balance_after = self.companies[&company_id].cash_cents;

        let travel_ticks = region::travel_ticks(&self.config, &origin, &destination);
        let logistics_multiplier = workforce::duration_multiplier_bps(
            &self.config,
            &self.workforces[&company_id].allocation,
            WorkforceFunction::Logistics,
            self.workforces[&company_id].corporate_efficiency_bps,
        );
        let effective_ticks =
            production::effective_duration_ticks(travel_ticks.max(1), logistics_multiplier);

        let id = ShipmentId::new(self.next_id.shipment);
        self.next_id.shipment += 1;
        let created_at = self.tick_clock();
        let shipment = Shipment {
            id,
            company_id,
            item_id,
            origin_region_id,
            destination_region_id,
            quantity,
            fee_cents: fee,
            status: ShipmentStatus::InTransit,
            departed_at_tick: self.tick,
            tick_arrives: self.tick + effective_ticks,
            created_at,
        };
        self.shipments.insert(id, shipment);

        self.append_ledger_entry(
            company_id,
            Some(origin_region_id),
            LedgerEntryType::ShipmentFee,
            -fee,
            0,
            balance_after,
            ReferenceType::Shipment,
            id.0,
        );
        Ok(id)
    }

    pub fn cancel_shipment(&mut self, shipment_id: ShipmentId, requester_company_id: CompanyId) -> Result<()> {
        let shipment = self
            .shipments
            .get(&shipment_id)
            .ok_or_else(|| DomainError::NotFound(format!("shipment {shipment_id}")))?;
        if shipment.company_id != requester_company_id {
            return Err(DomainError::Forbidden(
                "only the sending company can cancel a shipment".into(),
            ));
        }
        let (company_id, item_id, origin_region_id, quantity) =
            (shipment.company_id, shipment.item_id, shipment.origin_region_id, shipment.quantity);
        shipment::cancel_shipment(self.shipments.get_mut(&shipment_id).unwrap())?;

        let key = InventoryKey::new(company_id, item_id, origin_region_id);
        let row = self.inventory_row_mut(key);
        let next_state = reservation::add_inventory(row.state(), quantity)?;
        row.apply_state(next_state);
        Ok(())
    }

    /// Deliver every shipment due this tick, in `(tickArrives, createdAt,
    /// id)` order. Delivery is all-or-nothing: a shipment that doesn't fit
    /// the destination's remaining capacity bounces back to the sender's
    /// origin inventory in full rather than partially landing.
    pub fn deliver_due_shipments(&mut self) {
        let mut due: Vec<ShipmentId> = self
            .shipments
            .values()
            .filter(|s| s.status == ShipmentStatus::InTransit && s.tick_arrives <= self.tick)
            .map(|s| s.id)
            .collect();
        due.sort_by_key(|id| {
            let s = &self.shipments[id];
            (s.tick_arrives, s.created_at, s.id.0)
        });

        for shipment_id in due {
            let shipment = self.shipments[&shipment_id];
            let destination_key =
                InventoryKey::new(shipment.company_id, shipment.item_id, shipment.destination_region_id);
            let current_total: Qty = self
                .inventories
                .iter()
                .filter(|(k, _)| k.company_id == shipment.company_id && k.region_id == shipment.destination_region_id)
                .map(|(_, row)| row.quantity)
                .sum();
            let active_warehouse_slots: u32 = self
                .buildings
                .values()
                .filter(|b| {
                    b.company_id == shipment.company_id
                        && b.region_id == shipment.destination_region_id
                        && b.building_type == crate::types::BuildingType::Warehouse
                        && b.status == crate::types::BuildingStatus::Active
                })
                .map(|b| b.capacity_slots)
                .sum();
            let capacity = building::regional_storage_capacity(&self.config, active_warehouse_slots);
            let outcome = shipment::resolve_delivery(&shipment, (capacity - current_total).max(0));

            if outcome.delivered_quantity > 0 {
                let row = self.inventory_row_mut(destination_key);
                let next_state = reservation::add_inventory(row.state(), outcome.delivered_quantity).unwrap();
                row.apply_state(next_state);
            }
            if outcome.returned_quantity > 0 {
                let origin_key =
                    InventoryKey::new(shipment.company_id, shipment.item_id, shipment.origin_region_id);
                let row = self.inventory_row_mut(origin_key);
                let next_state = reservation::add_inventory(row.state(), outcome.returned_quantity).unwrap();
                row.apply_state(next_state);
            }
            shipment::mark_delivered(self.shipments.get_mut(&shipment_id).unwrap()).unwrap();
        }
    }

    // ---------------------------------------------------------------
    // Workforce
    // ---------------------------------------------------------------

    /// Request a capacity change. Layoffs (negative deltas) apply
    /// immediately along with an efficiency penalty; hires stay deferred
    /// behind the configured hiring delay and trigger a hiring-shock
    /// efficiency drag once they land.
    pub fn request_capacity_change(&mut self, company_id: CompanyId, capacity_delta: i64) -> Result<WorkforceDeltaId> {
        let workforce = self
            .workforces
            .get(&company_id)
            .ok_or_else(|| DomainError::NotFound(format!("workforce for company {company_id}")))?;
        workforce::validate_capacity_change(&self.config, workforce.capacity, capacity_delta)?;

        if capacity_delta < 0 {
            let wf = self.workforces.get_mut(&company_id).unwrap();
            wf.capacity = (wf.capacity as i64 + capacity_delta).max(0) as u32;
            wf.corporate_efficiency_bps =
                wf.corporate_efficiency_bps.saturating_sub(self.config.workforce.layoff_efficiency_penalty_bps);
            let id = WorkforceDeltaId::new(self.next_id.workforce_delta);
            self.next_id.workforce_delta += 1;
            return Ok(id);
        }

        let recruitment_cost =
            capacity_delta as Cents * self.config.workforce.recruitment_cost_per_capacity_cents;
        let company = self.company_mut(company_id)?;
        let next_state = reservation::debit_cash(company.cash_state(), recruitment_cost)?;
        company.apply_cash_state(next_state);
        let balance_after = self.companies[&company_id].cash_cents;
        self.append_ledger_entry(
            company_id,
            None,
            LedgerEntryType::WorkforceRecruitmentExpense,
            -recruitment_cost,
            0,
            balance_after,
            ReferenceType::WorkforceDelta,
            0,
        );

        let id = WorkforceDeltaId::new(self.next_id.workforce_delta);
        self.next_id.workforce_delta += 1;
        let delta = WorkforceDelta {
            id,
            company_id,
            capacity_delta,
            requested_at_tick: self.tick,
            effective_at_tick: self.tick + self.config.workforce.hiring_delay_ticks,
        };
        self.workforce_deltas.push(delta);
        Ok(id)
    }

    /// Apply every workforce delta that has reached its effective tick,
    /// arming the hiring-shock window for the capacity it brings on.
    pub fn apply_due_workforce_deltas(&mut self) {
        let due: Vec<usize> = self
            .workforce_deltas
            .iter()
            .enumerate()
            .filter(|(_, d)| d.effective_at_tick <= self.tick)
            .map(|(i, _)| i)
            .collect();
        let mut applied_deltas = Vec::new();
        for idx in due.into_iter().rev() {
            applied_deltas.push(self.workforce_deltas.remove(idx));
        }
        for delta in applied_deltas {
            if let Some(workforce) = self.workforces.get_mut(&delta.company_id) {
                let new_capacity = (workforce.capacity as i64 + delta.capacity_delta).max(0);
                workforce.capacity = new_capacity as u32;
                if delta.capacity_delta > 0 {
                    workforce.pending_hiring_shock_capacity = workforce
                        .pending_hiring_shock_capacity
                        .saturating_add(delta.capacity_delta as u32);
                    workforce.hiring_shock_expires_tick =
                        self.tick + self.config.workforce.hiring_shock_duration_ticks;
                }
            }
        }
    }

    /// Pay salaries and step corporate efficiency for every company with a
    /// workforce, once per tick. Salary is scaled by the company's home
    /// region's salary modifier and paid only as far as available cash
    /// stretches; any shortfall still feeds the efficiency penalty.
    pub fn run_workforce_pass(&mut self) {
        let company_ids: Vec<CompanyId> = self.workforces.keys().copied().collect();
        for company_id in company_ids {
            let capacity = self.workforces[&company_id].capacity;
            if capacity == 0 {
                continue;
            }
            let Some((home_region_id, cash_state)) = self
                .companies
                .get(&company_id)
                .map(|c| (c.home_region_id, c.cash_state()))
            else {
                continue;
            };
            let region_code = self.region_by_id(home_region_id).map(|r| r.code.clone()).unwrap_or_default();
            let modifier_bps = *self
                .config
                .workforce
                .region_salary_modifier_bps_by_code
                .get(&region_code)
                .unwrap_or(&10_000);
            let salary_due = capacity as Cents * self.config.workforce.base_salary_per_capacity_cents
                * modifier_bps as Cents
                / 10_000;
            let salary_paid = salary_due.min(cash_state.available()).max(0);
            let shortfall = salary_paid < salary_due;

            if salary_paid > 0 {
                let next_state = reservation::debit_cash(cash_state, salary_paid)
                    .expect("salary payment never exceeds available cash");
                self.companies.get_mut(&company_id).unwrap().apply_cash_state(next_state);
                let balance_after = self.companies[&company_id].cash_cents;
                self.append_ledger_entry(
                    company_id,
                    None,
                    LedgerEntryType::WorkforceSalaryExpense,
                    -salary_paid,
                    0,
                    balance_after,
                    ReferenceType::WorkforceDelta,
                    0,
                );
            }

            let workforce = self.workforces.get_mut(&company_id).unwrap();
            workforce.corporate_efficiency_bps =
                workforce::corporate_efficiency_step(&self.config, workforce, self.tick, shortfall);
        }
    }

    // ---------------------------------------------------------------
    // Contracts
    // ---------------------------------------------------------------

    /// Issue a bilateral contract in the issuer's home region.
    pub fn issue_contract(
        &mut self,
        issuer_company_id: CompanyId,
        item_id: ItemId,
        side: Side,
        price_cents: Cents,
        quantity: Qty,
    ) -> Result<ContractId> {
        let region_id = self.home_region_of(issuer_company_id)?;
        match side {
            Side::Buy => {
                let company = self.company_mut(issuer_company_id)?;
                let next_state = reservation::reserve_cash_for_buy(company.cash_state(), quantity, price_cents)?;
                company.apply_cash_state(next_state);
            }
            Side::Sell => {
                let key = InventoryKey::new(issuer_company_id, item_id, region_id);
                let row = self.inventory_row_mut(key);
                let next_state = reservation::reserve_inventory_for_sell(row.state(), quantity)?;
                row.apply_state(next_state);
            }
        }

        let id = ContractId::new(self.next_id.contract);
        self.next_id.contract += 1;
        let expires_at_tick = contract::default_expiry_tick(&self.config, self.tick);
        self.contracts.insert(
            id,
            Contract {
                id,
                issuer_company_id,
                counterparty_company_id: None,
                item_id,
                region_id,
                side,
                price_cents,
                quantity,
                status: crate::types::ContractStatus::Open,
                issued_at_tick: self.tick,
                expires_at_tick,
            },
        );
        Ok(id)
    }

    pub fn accept_contract(&mut self, contract_id: ContractId, counterparty_company_id: CompanyId) -> Result<()> {
        let current_tick = self.tick;
        {
            let c = self
                .contracts
                .get_mut(&contract_id)
                .ok_or_else(|| DomainError::NotFound(format!("contract {contract_id}")))?;
            contract::accept_contract(c, counterparty_company_id, current_tick)?;
        }
        let c = self.contracts[&contract_id];
        let (buyer_id, seller_id) = contract::settlement_parties(&c);
        let notional = c.price_cents * c.quantity as Cents;
        let buyer_was_issuer = buyer_id == c.issuer_company_id;

        if let Some(company) = self.companies.get(&buyer_id) {
            let next_state = if buyer_was_issuer {
                let reserved = c.quantity as Cents * c.price_cents;
                reservation::settle_cash(company.cash_state(), reserved, notional)
            } else {
                reservation::debit_cash(company.cash_state(), notional)
            };
            self.companies.get_mut(&buyer_id).unwrap().apply_cash_state(next_state?);
        }
        let buyer_balance_after = self.companies.get(&buyer_id).map(|c| c.cash_cents).unwrap_or(0);

        if let Some(company) = self.companies.get(&seller_id) {
            let next_state = reservation::credit_cash(company.cash_state(), notional)?;
            self.companies.get_mut(&seller_id).unwrap().apply_cash_state(next_state);
        }
        let seller_balance_after = self.companies.get(&seller_id).map(|c| c.cash_cents).unwrap_or(0);

        let buyer_key = InventoryKey::new(buyer_id, c.item_id, c.region_id);
        let buyer_row = self.inventory_row_mut(buyer_key);
        let buyer_state = reservation::add_inventory(buyer_row.state(), c.quantity)?;
        buyer_row.apply_state(buyer_state);

        let seller_key = InventoryKey::new(seller_id, c.item_id, c.region_id);
        let seller_row = self.inventory_row_mut(seller_key);
        let seller_state = if seller_id == c.issuer_company_id {
            reservation::consume_inventory(seller_row.state(), c.quantity)?
        } else {
            reservation::remove_inventory(seller_row.state(), c.quantity)?
        };
        seller_row.apply_state(seller_state);

        contract::fulfil_contract(self.contracts.get_mut(&contract_id).unwrap())?;
        self.append_ledger_entry(
            buyer_id,
            Some(c.region_id),
            LedgerEntryType::ContractSettlement,
            -notional,
            if buyer_was_issuer { -notional } else { 0 },
            buyer_balance_after,
            ReferenceType::Contract,
            contract_id.0,
        );
        self.append_ledger_entry(
            seller_id,
            Some(c.region_id),
            LedgerEntryType::ContractSettlement,
            notional,
            0,
            seller_balance_after,
            ReferenceType::Contract,
            contract_id.0,
        );
        Ok(())
    }

    pub fn cancel_contract(&mut self, contract_id: ContractId, requester_company_id: CompanyId) -> Result<()> {
        let c = self
            .contracts
            .get(&contract_id)
            .ok_or_else(|| DomainError::NotFound(format!("contract {contract_id}")))?;
        let (item_id, region_id, side, price_cents, quantity, issuer) =
            (c.item_id, c.region_id, c.side, c.price_cents, c.quantity, c.issuer_company_id);
        contract::cancel_contract(self.contracts.get_mut(&contract_id).unwrap(), requester_company_id)?;

        match side {
            Side::Buy => {
                let company = self.company_mut(issuer)?;
                let next_state = reservation::release_cash(company.cash_state(), quantity as Cents * price_cents)?;
                company.apply_cash_state(next_state);
            }
            Side::Sell => {
                let key = InventoryKey::new(issuer, item_id, region_id);
                let row = self.inventory_row_mut(key);
                let next_state = reservation::release_inventory(row.state(), quantity)?;
                row.apply_state(next_state);
            }
        }
        Ok(())
    }

    /// Expire due contracts and release the issuer's reservation for each.
    pub fn expire_due_contracts(&mut self) {
        let mut contracts: Vec<Contract> = self.contracts.values().copied().collect();
        let expired_ids = contract::expire_due_contracts(&mut contracts, self.tick);
        for c in &contracts {
            self.contracts.insert(c.id, *c);
        }
        for id in expired_ids {
            let c = self.contracts[&id];
            match c.side {
                Side::Buy => {
                    if let Some(company) = self.companies.get(&c.issuer_company_id) {
                        if let Ok(state) =
                            reservation::release_cash(company.cash_state(), c.quantity as Cents * c.price_cents)
                        {
                            self.companies.get_mut(&c.issuer_company_id).unwrap().apply_cash_state(state);
                        }
                    }
                }
                Side::Sell => {
                    let key = InventoryKey::new(c.issuer_company_id, c.item_id, c.region_id);
                    let row = self.inventory_row_mut(key);
                    if let Ok(state) = reservation::release_inventory(row.state(), c.quantity) {
                        row.apply_state(state);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BuildingType;

    fn setup() -> (World, CompanyId, RegionId) {
        let mut world = World::new(SimConfig::default());
        let region_id = world.regions[0].id;
        let player = world.resolve_or_create_player("ext-1");
        let company_id = world
            .create_company(player, region_id, "Acme", 100_000)
            .unwrap();
        (world, company_id, region_id)
    }

    #[test]
    fn place_order_reserves_cash_for_buy() {
        let (mut world, company_id, _region_id) = setup();
        world.items.push(Item {
            id: ItemId::new(1),
            code: "iron".into(),
            name: "Iron".into(),
        });
        let order_id = world
            .place_order(company_id, ItemId::new(1), Side::Buy, 100, 5)
            .unwrap();
        assert_eq!(world.companies[&company_id].reserved_cash_cents, 500);
        let order = world.market_orders[&order_id];
        assert_eq!(order.status, OrderStatus::Open);
    }

    #[test]
    fn orders_rest_until_the_next_matching_pass() {
        let (mut world, buyer_id, region_id) = setup();
        let player2 = world.resolve_or_create_player("ext-2");
        let seller_id = world.create_company(player2, region_id, "Widgets", 100_000).unwrap();
        let item_id = ItemId::new(1);

        let key = InventoryKey::new(seller_id, item_id, region_id);
        world.inventories.insert(key, {
            let mut row = InventoryRow::new(key);
            row.quantity = 10;
            row
        });

        world.place_order(seller_id, item_id, Side::Sell, 90, 10).unwrap();
        world.place_order(buyer_id, item_id, Side::Buy, 100, 5).unwrap();

        // Matching hasn't run yet: both orders are still just resting.
        assert_eq!(world.companies[&buyer_id].cash_cents, 100_000);
        assert_eq!(world.companies[&seller_id].cash_cents, 100_000);

        world.run_matching_pass();

        assert_eq!(world.companies[&buyer_id].cash_cents, 100_000 - 90 * 5);
        assert_eq!(world.companies[&seller_id].cash_cents, 100_000 + 90 * 5);
        let buyer_key = InventoryKey::new(buyer_id, item_id, region_id);
        assert_eq!(world.inventories[&buyer_key].quantity, 5);
        assert_eq!(world.trades.len(), 1);
    }

    #[test]
    fn cancel_order_releases_exact_reservation() {
        let (mut world, company_id, _region_id) = setup();
        let item_id = ItemId::new(1);
        let order_id = world.place_order(company_id, item_id, Side::Buy, 100, 5).unwrap();
        world.cancel_order(order_id, company_id).unwrap();
        assert_eq!(world.companies[&company_id].reserved_cash_cents, 0);
        assert_eq!(world.companies[&company_id].cash_cents, 100_000);
    }

    #[test]
    fn shipment_overflow_returns_entire_shipment_to_sender() {
        let (mut world, company_id, region_id) = setup();
        let other_region = world.regions[1].id;
        let item_id = ItemId::new(1);
        let origin_key = InventoryKey::new(company_id, item_id, region_id);
        world.inventories.insert(origin_key, {
            let mut row = InventoryRow::new(origin_key);
            row.quantity = 2000;
            row
        });
        let shipment_id = world
            .create_shipment(company_id, item_id, other_region, 2000)
            .unwrap();
        world.tick = world.shipments[&shipment_id].tick_arrives;
        world.deliver_due_shipments();

        let destination_key = InventoryKey::new(company_id, item_id, other_region);
        let delivered = world.inventories.get(&destination_key).map(|r| r.quantity).unwrap_or(0);
        let returned = world.inventories.get(&origin_key).map(|r| r.quantity).unwrap_or(0);
        assert_eq!(delivered, 0);
        assert_eq!(returned, 2000);
    }

    #[test]
    fn building_deactivates_when_company_cannot_afford_operating_cost() {
        let (mut world, company_id, region_id) = setup();
        let building_id = world
            .acquire_building(company_id, region_id, BuildingType::Factory, 50, 1_000_000, 0)
            .unwrap();
        // Drain the company to below the operating cost.
        let company = world.companies.get_mut(&company_id).unwrap();
        company.cash_cents = 10;
        world.tick += world.config.buildings.operating_cost_interval_ticks;
        world.sweep_operating_costs();
        assert_eq!(world.buildings[&building_id].status, crate::types::BuildingStatus::Inactive);
    }

    #[test]
    fn layoff_applies_immediately_with_efficiency_penalty() {
        let (mut world, company_id, _region_id) = setup();
        world.workforces.get_mut(&company_id).unwrap().capacity = 100;
        let before_efficiency = world.workforces[&company_id].corporate_efficiency_bps;
        world.request_capacity_change(company_id, -20).unwrap();
        assert_eq!(world.workforces[&company_id].capacity, 80);
        assert!(world.workforces[&company_id].corporate_efficiency_bps < before_efficiency);
    }

    #[test]
    fn production_job_runs_scale_input_reservation_and_output() {
        let (mut world, company_id, region_id) = setup();
        world.recipes.push(crate::item::Recipe {
            id: RecipeId::new(1),
            code: "smelt".into(),
            building_type: BuildingType::Factory,
            inputs: vec![crate::item::RecipeInput {
                item_id: ItemId::new(1),
                quantity: 2,
            }],
            outputs: vec![crate::item::RecipeOutput {
                item_id: ItemId::new(2),
                quantity: 1,
            }],
            base_duration_ticks: 4,
        });
        world.company_recipes.push(CompanyRecipe {
            company_id,
            recipe_id: RecipeId::new(1),
            unlocked: true,
        });
        let building_id = world
            .acquire_building(company_id, region_id, BuildingType::Factory, 0, 0, 0)
            .unwrap();
        let input_key = InventoryKey::new(company_id, ItemId::new(1), region_id);
        world.inventories.insert(input_key, {
            let mut row = InventoryRow::new(input_key);
            row.quantity = 10;
            row
        });

        let job_id = world
            .create_production_job(company_id, building_id, RecipeId::new(1), 3)
            .unwrap();
        assert_eq!(world.inventories[&input_key].quantity, 4);

        world.tick = world.production_jobs[&job_id].due_tick;
        world.complete_due_production_jobs();
        let output_key = InventoryKey::new(company_id, ItemId::new(2), region_id);
        assert_eq!(world.inventories[&output_key].quantity, 3);
    }
}
