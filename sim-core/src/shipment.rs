//! Shipments: inter-region goods transfer.

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::error::{DomainError, Result};
use crate::types::{Cents, CompanyId, ItemId, Qty, RegionId, ShipmentId, ShipmentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: ShipmentId,
    pub company_id: CompanyId,
    pub item_id: ItemId,
    pub origin_region_id: RegionId,
    pub destination_region_id: RegionId,
    pub quantity: Qty,
    #[serde(with = "crate::types::cents_as_string")]
    pub fee_cents: Cents,
    pub status: ShipmentStatus,
    pub departed_at_tick: u64,
    pub tick_arrives: u64,
    pub created_at: i64,
}

/// `baseFeeCents + feePerUnitCents * quantity`, charged up front when the
/// shipment departs.
pub fn shipment_fee_cents(config: &SimConfig, quantity: Qty) -> Cents {
    config.shipment.base_fee_cents + config.shipment.fee_per_unit_cents * quantity as Cents
}

pub fn cancel_shipment(shipment: &mut Shipment) -> Result<()> {
    if shipment.status != ShipmentStatus::InTransit {
        return Err(DomainError::DomainInvariant(
            "only an in-transit shipment can be cancelled".into(),
        ));
    }
    shipment.status = ShipmentStatus::Cancelled;
    Ok(())
}

/// Outcome of attempting to deliver a shipment into the destination's
/// regional storage. Delivery is all-or-nothing: there is no partial
/// delivery of a shipment, so either the whole quantity lands at the
/// destination or the whole quantity returns to the sender's origin
/// inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub delivered_quantity: Qty,
    pub returned_quantity: Qty,
}

/// Decide whether `shipment.quantity` fits in the destination's remaining
/// capacity. If it doesn't, the entire shipment bounces back to the sender
/// rather than being split across the two regions.
pub fn resolve_delivery(shipment: &Shipment, destination_remaining_capacity: Qty) -> DeliveryOutcome {
    if shipment.quantity <= destination_remaining_capacity.max(0) {
        DeliveryOutcome {
            delivered_quantity: shipment.quantity,
            returned_quantity: 0,
        }
    } else {
        DeliveryOutcome {
            delivered_quantity: 0,
            returned_quantity: shipment.quantity,
        }
    }
}

pub fn mark_delivered(shipment: &mut Shipment) -> Result<()> {
    if shipment.status != ShipmentStatus::InTransit {
        return Err(DomainError::DomainInvariant(
            "only an in-transit shipment can be delivered".into(),
        ));
    }
    shipment.status = ShipmentStatus::Delivered;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shipment(qty: Qty) -> Shipment {
        Shipment {
            id: ShipmentId::new(1),
            company_id: CompanyId::new(1),
            item_id: ItemId::new(1),
            origin_region_id: RegionId::new(1),
            destination_region_id: RegionId::new(2),
            quantity: qty,
            fee_cents: 0,
            status: ShipmentStatus::InTransit,
            departed_at_tick: 0,
            tick_arrives: 5,
            created_at: 0,
        }
    }

    #[test]
    fn shipment_fee_scales_with_quantity() {
        let config = SimConfig::default();
        let fee = shipment_fee_cents(&config, 10);
        assert_eq!(
            fee,
            config.shipment.base_fee_cents + config.shipment.fee_per_unit_cents * 10
        );
    }

    #[test]
    fn resolve_delivery_returns_entire_shipment_when_capacity_exceeded() {
        let outcome = resolve_delivery(&shipment(100), 40);
        assert_eq!(outcome.delivered_quantity, 0);
        assert_eq!(outcome.returned_quantity, 100);
    }

    #[test]
    fn resolve_delivery_handles_full_capacity() {
        let outcome = resolve_delivery(&shipment(100), 500);
        assert_eq!(outcome.delivered_quantity, 100);
        assert_eq!(outcome.returned_quantity, 0);
    }

    #[test]
    fn cancel_shipment_requires_in_transit() {
        let mut s = shipment(10);
        mark_delivered(&mut s).unwrap();
        assert!(cancel_shipment(&mut s).is_err());
    }
}
