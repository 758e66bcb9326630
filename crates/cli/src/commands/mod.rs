//! CLI command implementations.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod orders;

use std::io::{BufRead, Write};

use nexus_market_client::{CheckoutError, SessionError, SetupError};
use nexus_market_core::PriceError;
use secrecy::SecretString;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Client could not be assembled.
    #[error(transparent)]
    Setup(#[from] SetupError),

    /// API call failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Checkout failed.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// A price argument is not a decimal amount.
    #[error("Invalid price: {0}")]
    InvalidPrice(#[from] PriceError),

    /// Other invalid argument.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Reading from the terminal failed.
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

/// Use `provided`, or prompt for a password on stdin.
pub fn password_or_prompt(provided: Option<String>) -> Result<SecretString, CommandError> {
    if let Some(password) = provided {
        return Ok(SecretString::from(password));
    }

    let mut stderr = std::io::stderr();
    write!(stderr, "Password: ")?;
    stderr.flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();

    if password.is_empty() {
        return Err(CommandError::InvalidInput(
            "password cannot be empty".to_string(),
        ));
    }
    Ok(SecretString::from(password))
}
