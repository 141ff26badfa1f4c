//! Outbound notifications. Only email is delivered today.

pub mod email;

pub use email::{EmailConfig, EmailError, Mailer};
