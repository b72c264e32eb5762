//! Append-only double-entry cash ledger.
//!
//! Every cash movement in the simulation is recorded here in addition to
//! being applied to the owning company's balance, so the ledger can be
//! replayed independently to verify that `sum(entries for company) ==
//! company.cashCents` at any tick boundary.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};
use crate::types::{Cents, CompanyId, LedgerEntryId, LedgerEntryType, ReferenceType, RegionId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub company_id: CompanyId,
    pub region_id: Option<RegionId>,
    pub entry_type: LedgerEntryType,
    /// Signed change to `company.cashCents`. Zero for entries that only move
    /// money between `cashCents` and `reservedCashCents` without any cash
    /// actually leaving or entering the company (e.g. placing an order).
    #[serde(with = "crate::types::cents_as_string")]
    pub amount_cents: Cents,
    /// Signed change to `company.reservedCashCents`.
    #[serde(with = "crate::types::cents_as_string")]
    pub delta_reserved_cash_cents: Cents,
    /// `company.cashCents` immediately after this entry was applied.
    #[serde(with = "crate::types::cents_as_string")]
    pub balance_after_cents: Cents,
    pub reference_type: ReferenceType,
    pub reference_id: u64,
    pub tick: u64,
    pub created_at: i64,
}

/// Opaque pagination cursor: `(createdAt, id)` tiebreak, matching the
/// ordering contract the ledger query is specified to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerCursor {
    pub created_at: i64,
    pub id: u64,
}

impl LedgerCursor {
    pub fn of(entry: &LedgerEntry) -> Self {
        Self {
            created_at: entry.created_at,
            id: entry.id.0,
        }
    }

    /// Encode as a URL-safe base64 string wrapping the JSON cursor body, the
    /// opaque format external callers are expected to pass back unmodified.
    pub fn encode(&self) -> String {
        let json = serde_json::to_vec(self).expect("LedgerCursor serializes infallibly");
        URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(raw: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(raw)
            .map_err(|e| DomainError::DomainInvariant(format!("invalid cursor encoding: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| DomainError::DomainInvariant(format!("invalid cursor payload: {e}")))
    }

    /// Whether `entry` sorts strictly after this cursor under the ledger's
    /// pagination order, `(createdAt desc, id desc)` (most recent first).
    pub fn is_after(&self, entry: &LedgerEntry) -> bool {
        (entry.created_at, entry.id.0) < (self.created_at, self.id)
    }
}

/// Append-only store of ledger entries, kept in insertion order (which is
/// itself `(createdAt, id)` non-decreasing since both are monotonic counters
/// owned by the same world); queries page through it most-recent-first.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new entry. Callers are responsible for having already applied
    /// the corresponding balance mutation via the reservation algebra; this
    /// only records the fact.
    pub fn append(&mut self, entry: LedgerEntry) {
        self.entries.push(entry);
    }

    pub fn for_company(&self, company_id: CompanyId) -> impl Iterator<Item = &LedgerEntry> {
        self.entries
            .iter()
            .filter(move |e| e.company_id == company_id)
    }

    /// Page through a company's entries newest-first, in
    /// `(createdAt desc, id desc)` order, returning at most `limit` entries
    /// and the cursor to resume from.
    pub fn page_for_company(
        &self,
        company_id: CompanyId,
        after: Option<LedgerCursor>,
        limit: usize,
    ) -> (Vec<LedgerEntry>, Option<LedgerCursor>) {
        let mut matching: Vec<&LedgerEntry> = self
            .for_company(company_id)
            .filter(|e| after.map(|c| c.is_after(e)).unwrap_or(true))
            .collect();
        matching.sort_by(|a, b| (b.created_at, b.id.0).cmp(&(a.created_at, a.id.0)));

        let page: Vec<LedgerEntry> = matching.into_iter().take(limit).cloned().collect();
        let next_cursor = page.last().map(LedgerCursor::of);
        (page, next_cursor)
    }

    /// Replay every entry for a company and assert the signed sum equals
    /// `expected_cash_cents`. Used by invariant checks and tests, never by
    /// command handlers themselves.
    pub fn assert_balance(&self, company_id: CompanyId, expected_cash_cents: Cents) -> Result<()> {
        let total: Cents = self.for_company(company_id).map(|e| e.amount_cents).sum();
        if total != expected_cash_cents {
            return Err(DomainError::DomainInvariant(format!(
                "ledger replay for company {company_id} sums to {total}, expected {expected_cash_cents}"
            )));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u64, company: u64, amount: Cents, created_at: i64) -> LedgerEntry {
        LedgerEntry {
            id: LedgerEntryId::new(id),
            company_id: CompanyId::new(company),
            region_id: None,
            entry_type: LedgerEntryType::TradeSettlement,
            amount_cents: amount,
            delta_reserved_cash_cents: 0,
            balance_after_cents: amount,
            reference_type: ReferenceType::Trade,
            reference_id: id,
            tick: 0,
            created_at,
        }
    }

    #[test]
    fn cursor_round_trips_through_base64() {
        let cursor = LedgerCursor {
            created_at: 1234,
            id: 7,
        };
        let encoded = cursor.encode();
        let decoded = LedgerCursor::decode(&encoded).unwrap();
        assert_eq!(cursor, decoded);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(LedgerCursor::decode("not valid base64!!").is_err());
    }

    #[test]
    fn page_for_company_respects_cursor_and_limit() {
        let mut ledger = Ledger::new();
        for i in 0..5 {
            ledger.append(entry(i, 1, 100, i as i64));
        }
        let (page1, cursor1) = ledger.page_for_company(CompanyId::new(1), None, 2);
        assert_eq!(page1.len(), 2);
        assert_eq!(page1[0].id.0, 4);
        assert_eq!(page1[1].id.0, 3);

        let (page2, _) = ledger.page_for_company(CompanyId::new(1), cursor1, 10);
        assert_eq!(page2.len(), 3);
        assert_eq!(page2[0].id.0, 2);
        assert_eq!(page2[2].id.0, 0);
    }

    #[test]
    fn assert_balance_detects_mismatch() {
        let mut ledger = Ledger::new();
        ledger.append(entry(0, 1, 500, 0));
        ledger.append(entry(1, 1, -100, 1));
        assert!(ledger.assert_balance(CompanyId::new(1), 400).is_ok());
        assert!(ledger.assert_balance(CompanyId::new(1), 999).is_err());
    }
}
