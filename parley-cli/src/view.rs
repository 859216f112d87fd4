//! Terminal rendering of the chat transcript

use console::style;
use parley_core::message::{ChatMessage, Ownership};

const MIN_WIDTH: usize = 20;

/// Lay out one message: own messages right-aligned, others prefixed with
/// their sender
pub fn format_message(message: &ChatMessage, ownership: Ownership, width: usize) -> String {
    let width = width.max(MIN_WIDTH);
    match ownership {
        Ownership::Own => format!("{:>width$}", message.message, width = width),
        Ownership::Other => {
            let sender = message
                .sender_id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "?".to_string());
            format!("[{}] {}", sender, message.message)
        }
    }
}

/// Print one message to stdout
pub fn print_message(message: &ChatMessage, ownership: Ownership) {
    let width = console::Term::stdout().size().1 as usize;
    let line = format_message(message, ownership, width);
    match ownership {
        Ownership::Own => println!("{}", style(line).cyan()),
        Ownership::Other => println!("{}", line),
    }
}
