//! Command implementations. Output goes to stdout; logs go to stderr.

#![allow(clippy::print_stdout)]

pub mod account;
pub mod cart;
pub mod menu;
pub mod orders;

use catering_client::Alert;
use secrecy::SecretString;
use tokio::io::{AsyncBufReadExt, BufReader};

pub fn print_alert(alert: &Alert) {
    println!("{}: {}", alert.title, alert.message);
}

/// Use `given`, or read one line from stdin.
async fn password_or_stdin(given: Option<String>) -> SecretString {
    if let Some(password) = given {
        return SecretString::from(password);
    }
    println!("Password:");
    let mut line = String::new();
    let mut stdin = BufReader::new(tokio::io::stdin());
    if let Err(e) = stdin.read_line(&mut line).await {
        tracing::warn!(error = %e, "Failed to read password from stdin");
    }
    SecretString::from(line.trim_end_matches(['\r', '\n']).to_string())
}
