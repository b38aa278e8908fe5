//! Rarity notification
//!
//! [`RarityNotifier`] is the seam between the engine and whatever delivers
//! messages. Each of the seven rare [`RarityFlag`] states renders to its own
//! title and body. Delivery failures are returned to the caller, which logs
//! them and carries on ingesting.

pub mod summary;

use std::io::Write;
use tracing::info;

use crate::types::{RarityEvent, RarityFlag};

pub use summary::render_summary;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("failed to write notification: {0}")]
    Io(#[from] std::io::Error),

    #[error("notification for {hex} rejected: {reason}")]
    Rejected { hex: String, reason: String },
}

/// Rendered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub title: String,
    pub body: String,
}

/// Delivers rarity events somewhere a human will see them.
pub trait RarityNotifier: Send {
    fn notify(&mut self, event: &RarityEvent) -> Result<(), NotifyError>;
}

impl<T: RarityNotifier + ?Sized> RarityNotifier for Box<T> {
    fn notify(&mut self, event: &RarityEvent) -> Result<(), NotifyError> {
        (**self).notify(event)
    }
}

// ============================================================================
// Rendering
// ============================================================================

fn distance_label(event: &RarityEvent) -> String {
    event
        .sighting
        .distance_km
        .map_or_else(|| "  ?".to_string(), |d| format!("{d:3.0}"))
}

/// Title and body for an event; `None` for [`RarityFlag::None`].
pub fn render(event: &RarityEvent) -> Option<NotificationMessage> {
    let s = &event.sighting;
    let distance = distance_label(event);
    let direction = s.sector_label();
    let type_desc = s.type_label();
    let registration = s.registration_label();
    let operator = s.operator_label();
    let country = s.country_label();

    let (title, body) = match event.flag {
        RarityFlag::None => return None,
        RarityFlag::Type => (
            "Rare Aircraft Type Spotted",
            format!("{type_desc} ({registration})\n{distance} {direction}"),
        ),
        RarityFlag::Operator => (
            "Rare Operator Spotted",
            format!("{operator} flying {type_desc} ({registration})\n{distance} {direction}"),
        ),
        RarityFlag::Country => (
            "Rare Aircraft Country Spotted",
            format!("{country}-based {type_desc} ({registration})\n{distance} {direction}"),
        ),
        RarityFlag::TypeAndOperator => (
            "Rare Type & Operator Spotted",
            format!("{type_desc} ({registration}) operated by\n{operator}\n{distance} {direction}"),
        ),
        RarityFlag::TypeAndCountry => (
            "Rare Type & Country Spotted",
            format!("{type_desc} ({registration}) registered in\n{country}\n{distance} {direction}"),
        ),
        RarityFlag::OperatorAndCountry => (
            "Rare Operator & Country Spotted",
            format!("{operator}\nflying aircraft registered in\n{country}\n{distance} {direction}"),
        ),
        RarityFlag::Trifecta => (
            "TRIFECTA Spotted!",
            format!(
                "{} ({registration}),\nrun by {operator},\nregistered in\n{country}\n{distance} {direction}",
                s.display_type()
            ),
        ),
    };

    Some(NotificationMessage {
        title: title.to_string(),
        body,
    })
}

/// Single console line describing an event.
pub fn console_line(event: &RarityEvent) -> String {
    let s = &event.sighting;
    match event.flag {
        RarityFlag::None => format!("no rarity for {}", event.hex),
        RarityFlag::Type => format!("found rare type {}", s.info),
        RarityFlag::Operator => format!("found rare operator: {}", s.operator_label()),
        RarityFlag::Country => format!("found rare country: {}", s.country_label()),
        RarityFlag::TypeAndOperator => format!(
            "found rare type and operator: {} run by {}",
            s.info,
            s.operator_label()
        ),
        RarityFlag::TypeAndCountry => format!(
            "found rare type and country: {} -> {}",
            s.info,
            s.country_label()
        ),
        RarityFlag::OperatorAndCountry => format!(
            "found rare operator and country: {} -> {}",
            s.operator_label(),
            s.country_label()
        ),
        RarityFlag::Trifecta => format!(
            "found the TRIFECTA: {} -> {} -> {}",
            s.info,
            s.operator_label(),
            s.country_label()
        ),
    }
}

// ============================================================================
// Console Notifier
// ============================================================================

/// Writes rendered notifications to a text sink (stdout by default).
pub struct ConsoleNotifier {
    out: Box<dyn Write + Send>,
}

impl ConsoleNotifier {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }
}

impl RarityNotifier for ConsoleNotifier {
    fn notify(&mut self, event: &RarityEvent) -> Result<(), NotifyError> {
        let Some(message) = render(event) else {
            return Ok(());
        };

        info!(hex = %event.hex, flag = %event.flag, "✈️ {}", console_line(event));

        writeln!(self.out, ">>> {}", message.title)?;
        for line in message.body.lines() {
            writeln!(self.out, "    {line}")?;
        }
        self.out.flush()?;
        Ok(())
    }
}

/// Used when `notify.enabled = false`: events only reach the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl RarityNotifier for LogNotifier {
    fn notify(&mut self, event: &RarityEvent) -> Result<(), NotifyError> {
        if event.flag.is_rare() {
            info!(hex = %event.hex, flag = %event.flag, "{}", console_line(event));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
