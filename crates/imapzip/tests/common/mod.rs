//! Shared test utilities for imapzip integration tests.
//!
//! This module provides:
//! - `MockConnector`, an in-memory mailbox standing in for an IMAP server
//! - Builders for zip archives and MIME messages

pub mod builders;
pub mod mailbox;

pub use builders::*;
pub use mailbox::{MockConnector, MockMailbox};
