//! Contracts: bilateral standing offers settled outside the order book.
//! A contract is issued by one company naming a side, item, region,
//! quantity, and price; any other company may accept it, at which point
//! it settles immediately like a single matched trade.

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::error::{DomainError, Result};
use crate::types::{Cents, CompanyId, ContractId, ContractStatus, ItemId, Qty, RegionId, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub issuer_company_id: CompanyId,
    pub counterparty_company_id: Option<CompanyId>,
    pub item_id: ItemId,
    pub region_id: RegionId,
    /// The side the issuer takes: a `Buy` contract is the issuer offering to
    /// buy, so acceptance requires the counterparty to sell.
    pub side: Side,
    #[serde(with = "crate::types::cents_as_string")]
    pub price_cents: Cents,
    pub quantity: Qty,
    pub status: ContractStatus,
    pub issued_at_tick: u64,
    pub expires_at_tick: u64,
}

pub fn default_expiry_tick(config: &SimConfig, issued_at_tick: u64) -> u64 {
    issued_at_tick + config.contract.default_expiry_ticks
}

/// Accept an open, unexpired contract on behalf of `counterparty_company_id`.
/// A company may not accept its own contract.
pub fn accept_contract(
    contract: &mut Contract,
    counterparty_company_id: CompanyId,
    current_tick: u64,
) -> Result<()> {
    if contract.status != ContractStatus::Open {
        return Err(DomainError::DomainInvariant(
            "only an open contract can be accepted".into(),
        ));
    }
    if current_tick >= contract.expires_at_tick {
        return Err(DomainError::DomainInvariant(
            "contract has expired".into(),
        ));
    }
    if counterparty_company_id == contract.issuer_company_id {
        return Err(DomainError::Forbidden(
            "a company cannot accept its own contract".into(),
        ));
    }
    contract.counterparty_company_id = Some(counterparty_company_id);
    contract.status = ContractStatus::Accepted;
    Ok(())
}

pub fn fulfil_contract(contract: &mut Contract) -> Result<()> {
    if contract.status != ContractStatus::Accepted {
        return Err(DomainError::DomainInvariant(
            "only an accepted contract can be fulfilled".into(),
        ));
    }
    contract.status = ContractStatus::Fulfilled;
    Ok(())
}

pub fn cancel_contract(contract: &mut Contract, requester_company_id: CompanyId) -> Result<()> {
    if contract.status != ContractStatus::Open {
        return Err(DomainError::DomainInvariant(
            "only an open contract can be cancelled".into(),
        ));
    }
    if requester_company_id != contract.issuer_company_id {
        return Err(DomainError::Forbidden(
            "only the issuer can cancel a contract".into(),
        ));
    }
    contract.status = ContractStatus::Cancelled;
    Ok(())
}

/// Expire every open contract past its deadline, returning the ids expired
/// so the caller can release the issuer's reservation.
pub fn expire_due_contracts(contracts: &mut [Contract], current_tick: u64) -> Vec<ContractId> {
    let mut expired = Vec::new();
    for contract in contracts.iter_mut() {
        if contract.status == ContractStatus::Open && current_tick >= contract.expires_at_tick {
            contract.status = ContractStatus::Expired;
            expired.push(contract.id);
        }
    }
    expired
}

/// Which side of the trade the issuer and the accepting counterparty each
/// take, for ledger/inventory bookkeeping (issuer `Buy` means issuer pays
/// cash and receives goods; issuer `Sell` is the reverse).
pub fn settlement_parties(contract: &Contract) -> (CompanyId, CompanyId) {
    let counterparty = contract
        .counterparty_company_id
        .expect("settlement_parties called on an unaccepted contract");
    match contract.side {
        Side::Buy => (contract.issuer_company_id, counterparty),
        Side::Sell => (counterparty, contract.issuer_company_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract() -> Contract {
        Contract {
            id: ContractId::new(1),
            issuer_company_id: CompanyId::new(1),
            counterparty_company_id: None,
            item_id: ItemId::new(1),
            region_id: RegionId::new(1),
            side: Side::Buy,
            price_cents: 100,
            quantity: 10,
            status: ContractStatus::Open,
            issued_at_tick: 0,
            expires_at_tick: 14,
        }
    }

    #[test]
    fn accept_contract_rejects_issuer_as_counterparty() {
        let mut c = contract();
        assert!(accept_contract(&mut c, CompanyId::new(1), 1).is_err());
    }

    #[test]
    fn accept_contract_rejects_expired() {
        let mut c = contract();
        assert!(accept_contract(&mut c, CompanyId::new(2), 14).is_err());
    }

    #[test]
    fn accept_then_fulfil_happy_path() {
        let mut c = contract();
        accept_contract(&mut c, CompanyId::new(2), 5).unwrap();
        assert_eq!(c.status, ContractStatus::Accepted);
        fulfil_contract(&mut c).unwrap();
        assert_eq!(c.status, ContractStatus::Fulfilled);
    }

    #[test]
    fn expire_due_contracts_only_touches_open_past_deadline() {
        let mut contracts = vec![contract()];
        assert!(expire_due_contracts(&mut contracts, 10).is_empty());
        let expired = expire_due_contracts(&mut contracts, 14);
        assert_eq!(expired, vec![ContractId::new(1)]);
        assert_eq!(contracts[0].status, ContractStatus::Expired);
    }

    #[test]
    fn settlement_parties_orders_buyer_then_seller() {
        let mut c = contract();
        accept_contract(&mut c, CompanyId::new(2), 0).unwrap();
        let (buyer, seller) = settlement_parties(&c);
        assert_eq!(buyer, CompanyId::new(1));
        assert_eq!(seller, CompanyId::new(2));
    }
}
