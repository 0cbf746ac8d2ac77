//! Ticket ledger
//!
//! Owns every ticket of the session and decides, per identified visit, whether
//! it is the inbound leg of a new ticket or the outbound leg of an open one.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use weighbridge_types::{is_sentinel, LedgerError};

use crate::model::{Material, Ticket, TicketStatus, WeighLeg};

/// How visits with a failure sentinel identifier are matched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentinelPolicy {
    /// Sentinel visits always open their own ticket and never close one
    #[default]
    Isolate,
    /// Sentinels are matched like any other identifier string
    Pair,
}

impl std::fmt::Display for SentinelPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SentinelPolicy::Isolate => write!(f, "isolate"),
            SentinelPolicy::Pair => write!(f, "pair"),
        }
    }
}

/// One identified truck visit, ready to be booked
#[derive(Debug, Clone, PartialEq)]
pub struct VisitCapture {
    pub identifier: String,
    /// Weight read when identification completed
    pub weight: f64,
    pub captured_at: DateTime<Utc>,
    pub snapshot_digest: Option<String>,
}

impl VisitCapture {
    pub fn new(identifier: impl Into<String>, weight: f64) -> Self {
        Self {
            identifier: identifier.into(),
            weight,
            captured_at: Utc::now(),
            snapshot_digest: None,
        }
    }

    fn leg(&self) -> WeighLeg {
        WeighLeg {
            weight: self.weight,
            captured_at: self.captured_at,
            snapshot_digest: self.snapshot_digest.clone(),
        }
    }
}

/// What a visit did to the ledger
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerOutcome {
    Opened(Ticket),
    Closed(Ticket),
}

impl LedgerOutcome {
    pub fn ticket(&self) -> &Ticket {
        match self {
            LedgerOutcome::Opened(t) | LedgerOutcome::Closed(t) => t,
        }
    }
}

/// Session totals
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerSummary {
    pub open: usize,
    pub completed: usize,
    pub void: usize,
    /// kg over completed tickets
    pub total_net_weight: f64,
    /// Sum of positive ticket costs
    pub total_charged: f64,
    /// Sum of negative ticket costs (a negative number)
    pub total_paid_out: f64,
}

impl LedgerSummary {
    pub fn balance(&self) -> f64 {
        self.total_charged + self.total_paid_out
    }
}

#[derive(Debug, Default)]
pub struct TicketLedger {
    /// Creation order
    tickets: Vec<Ticket>,
    /// identifier -> index of its open ticket
    open_index: HashMap<String, usize>,
    policy: SentinelPolicy,
}

impl TicketLedger {
    pub fn new(policy: SentinelPolicy) -> Self {
        Self {
            tickets: Vec::new(),
            open_index: HashMap::new(),
            policy,
        }
    }

    /// Book a visit: close the open ticket for this identifier, or open a new
    /// one priced with `material`. Exactly one ticket is created or changed.
    ///
    /// Fails only if the open index points at a ticket that is no longer open;
    /// the stale entry is dropped and nothing is booked.
    pub fn record_visit(
        &mut self,
        visit: VisitCapture,
        material: &Material,
    ) -> Result<LedgerOutcome, LedgerError> {
        let matchable = self.is_matchable(&visit.identifier);

        if matchable {
            if let Some(index) = self.open_index.remove(&visit.identifier) {
                let ticket = &mut self.tickets[index];
                ticket.complete(visit.leg())?;
                info!(
                    ticket = ticket.id(),
                    vehicle = ticket.vehicle_identifier(),
                    net_weight = ticket.net_weight(),
                    total_cost = ticket.total_cost(),
                    "ticket closed"
                );
                return Ok(LedgerOutcome::Closed(ticket.clone()));
            }
        }

        let ticket = Ticket::open(visit.identifier.clone(), material, visit.leg());
        info!(
            ticket = ticket.id(),
            vehicle = ticket.vehicle_identifier(),
            inbound_weight = visit.weight,
            material = ticket.material_id(),
            "ticket opened"
        );
        self.tickets.push(ticket.clone());
        if matchable {
            self.open_index.insert(visit.identifier, self.tickets.len() - 1);
        }
        Ok(LedgerOutcome::Opened(ticket))
    }

    /// Cancel an open ticket
    pub fn void_ticket(&mut self, id: &str) -> Result<Ticket, LedgerError> {
        let index = self
            .tickets
            .iter()
            .position(|t| t.id() == id)
            .ok_or_else(|| LedgerError::TicketNotFound(id.to_string()))?;

        let ticket = &mut self.tickets[index];
        ticket.void(Utc::now())?;
        let identifier = ticket.vehicle_identifier().to_string();
        if self.open_index.get(&identifier) == Some(&index) {
            self.open_index.remove(&identifier);
        }
        info!(ticket = id, vehicle = %identifier, "ticket voided");
        Ok(self.tickets[index].clone())
    }

    fn is_matchable(&self, identifier: &str) -> bool {
        match self.policy {
            SentinelPolicy::Pair => true,
            SentinelPolicy::Isolate => !is_sentinel(identifier),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Ticket> {
        self.tickets.iter().find(|t| t.id() == id)
    }

    /// Open ticket that the next visit of `identifier` would close
    pub fn open_ticket_for(&self, identifier: &str) -> Option<&Ticket> {
        self.open_index.get(identifier).map(|&i| &self.tickets[i])
    }

    /// All tickets, newest first
    pub fn tickets(&self) -> Vec<&Ticket> {
        self.tickets.iter().rev().collect()
    }

    pub fn open_tickets(&self) -> Vec<&Ticket> {
        self.tickets.iter().rev().filter(|t| t.is_open()).collect()
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    pub fn summary(&self) -> LedgerSummary {
        let mut summary = LedgerSummary::default();
        for ticket in &self.tickets {
            match ticket.status() {
                TicketStatus::Open => summary.open += 1,
                TicketStatus::Void => summary.void += 1,
                TicketStatus::Completed => {
                    summary.completed += 1;
                    summary.total_net_weight += ticket.net_weight().unwrap_or(0.0);
                    let cost = ticket.total_cost().unwrap_or(0.0);
                    if cost >= 0.0 {
                        summary.total_charged += cost;
                    } else {
                        summary.total_paid_out += cost;
                    }
                }
            }
        }
        summary
    }
}
