//! Operator console: line commands read from stdin during `run`

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use weighbridge_app::SessionHandle;
use weighbridge_types::OutputFormat;

use crate::output::{output_summary, output_tickets};

const HELP: &str = "commands: capture | material <id> | void <ticket-id> | tickets | summary | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Force a transaction now
    Capture,
    Material(String),
    Void(String),
    Tickets,
    Summary,
    Help,
    Quit,
}

impl ConsoleCommand {
    /// `Ok(None)` for a blank line
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();

        let command = match (verb.to_ascii_lowercase().as_str(), arg) {
            ("capture", None) => ConsoleCommand::Capture,
            ("material", Some(id)) => ConsoleCommand::Material(id.to_string()),
            ("void", Some(id)) => ConsoleCommand::Void(id.to_string()),
            ("tickets", None) => ConsoleCommand::Tickets,
            ("summary", None) => ConsoleCommand::Summary,
            ("help", _) => ConsoleCommand::Help,
            ("quit", None) | ("exit", None) => ConsoleCommand::Quit,
            ("material", None) | ("void", None) => {
                return Err(format!("'{}' needs an argument; {}", verb, HELP))
            }
            _ => return Err(format!("unknown command '{}'; {}", line.trim(), HELP)),
        };
        Ok(Some(command))
    }
}

/// Read commands until stdin closes or the operator quits
pub async fn run(handle: SessionHandle, output_format: OutputFormat) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Console input failed");
                break;
            }
        };

        match ConsoleCommand::parse(&line) {
            Ok(Some(command)) => {
                if !apply(&handle, command, output_format) {
                    break;
                }
            }
            Ok(None) => {}
            Err(message) => eprintln!("{}", message),
        }
    }
}

/// Returns `false` when the console should stop
fn apply(handle: &SessionHandle, command: ConsoleCommand, output_format: OutputFormat) -> bool {
    let result = match command {
        ConsoleCommand::Capture => {
            if !handle.force_capture() {
                return false;
            }
            Ok(())
        }
        // Events report the change; only errors need printing
        ConsoleCommand::Material(id) => handle.select_material(&id).map(|_| ()),
        ConsoleCommand::Void(id) => resolve_ticket_id(handle, &id)
            .and_then(|full| handle.void_ticket(&full))
            .map(|_| ()),
        ConsoleCommand::Tickets => output_tickets(output_format, &handle.tickets()),
        ConsoleCommand::Summary => output_summary(output_format, &handle.summary()),
        ConsoleCommand::Help => {
            eprintln!("{}", HELP);
            Ok(())
        }
        ConsoleCommand::Quit => {
            handle.shutdown();
            return false;
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }
    true
}

/// Tickets are listed by their 8-character prefix; accept that or the full id
fn resolve_ticket_id(handle: &SessionHandle, id: &str) -> weighbridge_types::Result<String> {
    if handle.ticket(id).is_some() {
        return Ok(id.to_string());
    }
    let matches: Vec<String> = handle
        .tickets()
        .into_iter()
        .filter(|t| t.id().starts_with(id))
        .map(|t| t.id().to_string())
        .collect();
    match matches.as_slice() {
        [only] => Ok(only.clone()),
        _ => Err(weighbridge_types::LedgerError::TicketNotFound(id.to_string()).into()),
    }
}
