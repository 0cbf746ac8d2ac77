//! Output formatting module

use serde::Serialize;
use weighbridge_app::{SessionEvent, SessionReport};
use weighbridge_domain::{LedgerSummary, MaterialCatalog, Ticket};
use weighbridge_telemetry::FramerStats;
use weighbridge_types::{OutputFormat, Result, WeightSample};

/// Result of the `frame` command
#[derive(Debug, Serialize)]
pub struct FrameReport {
    pub samples: Vec<WeightSample>,
    pub stats: FramerStats,
    pub discarded_tail: usize,
}

/// One line per event; JSON lines in json mode
pub fn output_event(output_format: OutputFormat, event: &SessionEvent) -> Result<()> {
    if output_format == OutputFormat::Json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }

    match event {
        SessionEvent::Stable { weight } => println!("[stable]     {:.0} kg", weight),
        SessionEvent::TransactionStarted { trigger, weight } => {
            println!("[weighing]   {:?} at {:.0} kg", trigger, weight)
        }
        SessionEvent::Identified {
            identification,
            weight,
        } => println!(
            "[identified] {} ({:.0}%) at {:.0} kg",
            identification.identifier,
            identification.confidence * 100.0,
            weight
        ),
        SessionEvent::TicketOpened { ticket } => println!(
            "[opened]     {} {} in {:.0} kg ({})",
            short_id(ticket.id()),
            ticket.vehicle_identifier(),
            ticket.inbound().weight,
            ticket.material_name()
        ),
        SessionEvent::TicketClosed { ticket } => println!(
            "[closed]     {} {} net {:.0} kg, {:.2}",
            short_id(ticket.id()),
            ticket.vehicle_identifier(),
            ticket.net_weight().unwrap_or_default(),
            ticket.total_cost().unwrap_or_default()
        ),
        SessionEvent::TicketVoided { ticket } => {
            println!("[void]       {} {}", short_id(ticket.id()), ticket.vehicle_identifier())
        }
        SessionEvent::MaterialSelected { material } => println!(
            "[material]   {} ({:.2}/kg)",
            material.name, material.price_per_kg
        ),
        SessionEvent::CaptureSkipped { reason } => println!("[skipped]    {}", reason),
        SessionEvent::StreamEnded { end } => println!(
            "[ended]      {} ({} readings, {} dropped, {} oversized)",
            end.reason, end.stats.lines_parsed, end.stats.lines_dropped, end.stats.lines_oversized
        ),
    }
    Ok(())
}

pub fn output_tickets(output_format: OutputFormat, tickets: &[Ticket]) -> Result<()> {
    if output_format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(tickets)?);
        return Ok(());
    }

    if tickets.is_empty() {
        println!("No tickets.");
        return Ok(());
    }

    println!(
        "{:<8}  {:<14}  {:<10}  {:>9}  {:>9}  {:>9}  {:>10}  {}",
        "ID", "Vehicle", "Material", "In kg", "Out kg", "Net kg", "Amount", "Status"
    );
    println!("{}", "-".repeat(90));
    for ticket in tickets {
        println!(
            "{:<8}  {:<14}  {:<10}  {:>9.0}  {:>9}  {:>9}  {:>10}  {}",
            short_id(ticket.id()),
            ticket.vehicle_identifier(),
            ticket.material_id(),
            ticket.inbound().weight,
            ticket
                .outbound()
                .map(|leg| format!("{:.0}", leg.weight))
                .unwrap_or_else(|| "-".to_string()),
            ticket
                .net_weight()
                .map(|w| format!("{:.0}", w))
                .unwrap_or_else(|| "-".to_string()),
            ticket
                .total_cost()
                .map(|c| format!("{:.2}", c))
                .unwrap_or_else(|| "-".to_string()),
            ticket.status()
        );
    }
    Ok(())
}

pub fn output_summary(output_format: OutputFormat, summary: &LedgerSummary) -> Result<()> {
    if output_format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!("\nLedger Summary");
    println!("==============");
    println!("Open:            {}", summary.open);
    println!("Completed:       {}", summary.completed);
    println!("Void:            {}", summary.void);
    println!("Net weight:      {:.0} kg", summary.total_net_weight);
    println!("Charged:         {:.2}", summary.total_charged);
    println!("Paid out:        {:.2}", summary.total_paid_out);
    println!("Balance:         {:.2}", summary.balance());
    Ok(())
}

pub fn output_report(output_format: OutputFormat, report: &SessionReport) -> Result<()> {
    if output_format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("\nSession ended: {}", report.stream_end.reason);
    if report.stream_end.discarded_tail > 0 {
        println!(
            "Discarded {} bytes of unterminated input",
            report.stream_end.discarded_tail
        );
    }
    println!();
    output_tickets(output_format, &report.tickets)?;
    output_summary(output_format, &report.summary)
}

pub fn output_materials(output_format: OutputFormat, catalog: &MaterialCatalog) -> Result<()> {
    if output_format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(catalog.all())?);
        return Ok(());
    }

    println!("{:<12}  {:<20}  {:>10}  {}", "ID", "Name", "Price/kg", "Kind");
    println!("{}", "-".repeat(56));
    for material in catalog.all() {
        println!(
            "{:<12}  {:<20}  {:>10.2}  {}",
            material.id,
            material.name,
            material.price_per_kg,
            if material.is_payout() { "payout" } else { "charge" }
        );
    }
    Ok(())
}

pub fn output_frame(output_format: OutputFormat, report: &FrameReport) -> Result<()> {
    if output_format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for (i, sample) in report.samples.iter().enumerate() {
        println!("{:>6}  {:>12.2}", i + 1, sample.value);
    }
    println!("\nFraming Result");
    println!("==============");
    println!("Readings:        {}", report.stats.lines_parsed);
    println!("No reading:      {}", report.stats.lines_dropped);
    println!("Oversized:       {}", report.stats.lines_oversized);
    println!("Unterminated:    {} bytes", report.discarded_tail);
    Ok(())
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
