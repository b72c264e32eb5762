//! Deterministic, tick-driven multi-region economic simulation engine.
//!
//! The simulation models **companies** competing across a fixed set of
//! **regions**, each holding **inventory** of a shared **item** catalogue,
//! producing goods via **recipes** run in owned **buildings**, trading on a
//! per-`(item, region)` **continuous limit order book**, moving stock
//! between regions via **shipments**, staffing production through a
//! **workforce** allocation, and settling bilateral **contracts** outside the
//! order book. Every cash movement is recorded in an append-only
//! double-entry **ledger** that can be replayed to verify a company's
//! balance independently of its live state.
//!
//! ## Module structure
//!
//! - `types`       Core identifiers and value types (IDs, cents, enums)
//! - `error`       The closed `DomainError` taxonomy
//! - `config`      Tunable simulation parameters, explicitly threaded, no globals
//! - `reservation` Pure cash/inventory reservation algebra
//! - `ledger`      Append-only double-entry cash ledger with cursor pagination
//! - `region`      Fixed region catalogue and inter-region travel times
//! - `item`        Item, recipe, and per-company recipe-unlock catalogue
//! - `player`      External-identity resolution
//! - `company`     The company entity and its cash position
//! - `inventory`   Per-(company, item, region) inventory rows and storage caps
//! - `building`    Buildings: production facilities, warehouses, operating costs
//! - `market`      Order book, price-time matching, and OHLC/VWAP candles
//! - `production`  Production job lifecycle and the bot producer's fallback pricing
//! - `shipment`    Inter-region shipments, including overflow-return-to-sender
//! - `workforce`   Capacity, allocation, and the duration/travel multiplier derivation
//! - `contract`    Bilateral standing offers settled outside the order book
//! - `retry`       Bounded exponential-backoff retry for optimistic-lock conflicts
//! - `tick`        Per-tick pass ordering and the top-level tick driver
//! - `world`       The complete state container and every mutating command
//! - `queries`     Read-only projections over `World`

pub mod building;
pub mod company;
pub mod config;
pub mod contract;
pub mod error;
#[cfg(feature = "instrument")]
pub use instrument;
pub mod inventory;
pub mod item;
pub mod ledger;
pub mod market;
pub mod player;
pub mod production;
pub mod queries;
pub mod region;
pub mod reservation;
pub mod retry;
pub mod shipment;
pub mod tick;
pub mod types;
pub mod workforce;
pub mod world;

pub use error::{DomainError, Result};
pub use tick::{advance_tick, run_tick_with_retry};
pub use world::World;
