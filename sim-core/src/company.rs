//! Companies: the primary player-controlled economic actor.

use serde::{Deserialize, Serialize};

use crate::types::{Cents, CompanyId, PlayerId, RegionId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub owner_id: PlayerId,
    pub home_region_id: RegionId,
    pub name: String,
    #[serde(with = "crate::types::cents_as_string")]
    pub cash_cents: Cents,
    #[serde(with = "crate::types::cents_as_string")]
    pub reserved_cash_cents: Cents,
    /// Monotonic version bumped on every successful mutation, the basis of
    /// the company-level optimistic-concurrency check.
    pub lock_version: u64,
}

impl Company {
    pub fn new(
        id: CompanyId,
        owner_id: PlayerId,
        home_region_id: RegionId,
        name: impl Into<String>,
        starting_cash_cents: Cents,
    ) -> Self {
        Self {
            id,
            owner_id,
            home_region_id,
            name: name.into(),
            cash_cents: starting_cash_cents,
            reserved_cash_cents: 0,
            lock_version: 0,
        }
    }

    pub fn cash_state(&self) -> crate::reservation::CashState {
        crate::reservation::CashState {
            cash_cents: self.cash_cents,
            reserved_cash_cents: self.reserved_cash_cents,
        }
    }

    pub fn apply_cash_state(&mut self, state: crate::reservation::CashState) {
        self.cash_cents = state.cash_cents;
        self.reserved_cash_cents = state.reserved_cash_cents;
        self.lock_version += 1;
    }

    pub fn available_cash_cents(&self) -> Cents {
        self.cash_state().available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_cash_state_bumps_lock_version() {
        let mut company = Company::new(
            CompanyId::new(1),
            PlayerId::new(1),
            RegionId::new(1),
            "Acme",
            10_000,
        );
        let state = crate::reservation::reserve_cash_for_buy(company.cash_state(), 2, 100).unwrap();
        company.apply_cash_state(state);
        assert_eq!(company.lock_version, 1);
        assert_eq!(company.reserved_cash_cents, 200);
    }
}
