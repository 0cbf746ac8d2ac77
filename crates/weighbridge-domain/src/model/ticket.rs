//! Weighing ticket: pairs the inbound and outbound weighings of one vehicle

use chrono::{DateTime, Utc};
use serde::Serialize;
use weighbridge_types::LedgerError;

use super::Material;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Open,
    Completed,
    Void,
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketStatus::Open => write!(f, "open"),
            TicketStatus::Completed => write!(f, "completed"),
            TicketStatus::Void => write!(f, "void"),
        }
    }
}

/// One side of a weighing transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeighLeg {
    /// kg
    pub weight: f64,
    pub captured_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_digest: Option<String>,
}

impl WeighLeg {
    pub fn new(weight: f64, captured_at: DateTime<Utc>) -> Self {
        Self {
            weight,
            captured_at,
            snapshot_digest: None,
        }
    }
}

/// Weighing ticket.
///
/// Fields are private so the lifecycle (`Open -> Completed | Void`) and the
/// "settlement present iff completed" rule can only change through
/// [`Ticket::complete`] and [`Ticket::void`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ticket {
    id: String,
    vehicle_identifier: String,
    material_id: String,
    material_name: String,
    price_per_kg: f64,
    inbound: WeighLeg,
    #[serde(skip_serializing_if = "Option::is_none")]
    outbound: Option<WeighLeg>,
    #[serde(skip_serializing_if = "Option::is_none")]
    net_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_cost: Option<f64>,
    status: TicketStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    closed_at: Option<DateTime<Utc>>,
}

impl Ticket {
    /// Open a ticket for an inbound weighing, snapshotting the material price
    pub fn open(vehicle_identifier: impl Into<String>, material: &Material, inbound: WeighLeg) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            vehicle_identifier: vehicle_identifier.into(),
            material_id: material.id.clone(),
            material_name: material.name.clone(),
            price_per_kg: material.price_per_kg,
            inbound,
            outbound: None,
            net_weight: None,
            total_cost: None,
            status: TicketStatus::Open,
            closed_at: None,
        }
    }

    /// Close the ticket with its outbound weighing.
    ///
    /// Net weight is the absolute difference of the legs, so it does not matter
    /// whether the truck arrived loaded or empty. Cost uses the price captured
    /// when the ticket was opened.
    pub fn complete(&mut self, outbound: WeighLeg) -> Result<(), LedgerError> {
        self.ensure_open()?;
        let net_weight = (self.inbound.weight - outbound.weight).abs();
        self.net_weight = Some(net_weight);
        self.total_cost = Some(net_weight * self.price_per_kg);
        self.closed_at = Some(outbound.captured_at);
        self.outbound = Some(outbound);
        self.status = TicketStatus::Completed;
        Ok(())
    }

    /// Cancel an open ticket
    pub fn void(&mut self, at: DateTime<Utc>) -> Result<(), LedgerError> {
        self.ensure_open()?;
        self.status = TicketStatus::Void;
        self.closed_at = Some(at);
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), LedgerError> {
        if self.status == TicketStatus::Open {
            Ok(())
        } else {
            Err(LedgerError::NotOpen {
                id: self.id.clone(),
                status: self.status.to_string(),
            })
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn vehicle_identifier(&self) -> &str {
        &self.vehicle_identifier
    }

    pub fn material_id(&self) -> &str {
        &self.material_id
    }

    pub fn material_name(&self) -> &str {
        &self.material_name
    }

    pub fn price_per_kg(&self) -> f64 {
        self.price_per_kg
    }

    pub fn inbound(&self) -> &WeighLeg {
        &self.inbound
    }

    pub fn outbound(&self) -> Option<&WeighLeg> {
        self.outbound.as_ref()
    }

    pub fn net_weight(&self) -> Option<f64> {
        self.net_weight
    }

    pub fn total_cost(&self) -> Option<f64> {
        self.total_cost
    }

    pub fn status(&self) -> TicketStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status == TicketStatus::Open
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed() -> Material {
        Material::new("mixed", "Mixed Waste", 0.15)
    }

    #[test]
    fn test_open_ticket_has_no_settlement() {
        let ticket = Ticket::open("ABC123", &mixed(), WeighLeg::new(12000.0, Utc::now()));
        assert!(ticket.is_open());
        assert!(ticket.outbound().is_none());
        assert!(ticket.net_weight().is_none());
        assert!(ticket.total_cost().is_none());
        assert_eq!(ticket.material_id(), "mixed");
    }

    #[test]
    fn test_complete_computes_net_and_cost() {
        let mut ticket = Ticket::open("ABC123", &mixed(), WeighLeg::new(12000.0, Utc::now()));
        ticket.complete(WeighLeg::new(4000.0, Utc::now())).unwrap();
        assert_eq!(ticket.status(), TicketStatus::Completed);
        assert!((ticket.net_weight().unwrap() - 8000.0).abs() < 0.01);
        assert!((ticket.total_cost().unwrap() - 1200.0).abs() < 0.01);
        assert!(ticket.closed_at().is_some());
    }

    #[test]
    fn test_net_weight_is_absolute() {
        // Empty truck in, loaded truck out
        let mut ticket = Ticket::open("XYZ9", &mixed(), WeighLeg::new(4000.0, Utc::now()));
        ticket.complete(WeighLeg::new(12000.0, Utc::now())).unwrap();
        assert!((ticket.net_weight().unwrap() - 8000.0).abs() < 0.01);
    }

    #[test]
    fn test_terminal_states_reject_changes() {
        let mut ticket = Ticket::open("ABC123", &mixed(), WeighLeg::new(12000.0, Utc::now()));
        ticket.void(Utc::now()).unwrap();
        assert_eq!(ticket.status(), TicketStatus::Void);
        assert!(ticket.net_weight().is_none());
        assert!(matches!(
            ticket.complete(WeighLeg::new(4000.0, Utc::now())),
            Err(LedgerError::NotOpen { .. })
        ));
        assert!(ticket.void(Utc::now()).is_err());
    }

    #[test]
    fn test_serialized_open_ticket_omits_settlement() {
        let ticket = Ticket::open("ABC123", &mixed(), WeighLeg::new(12000.0, Utc::now()));
        let json = serde_json::to_value(&ticket).unwrap();
        assert_eq!(json["status"], "open");
        assert!(json.get("net_weight").is_none());
        assert!(json.get("total_cost").is_none());
    }
}
