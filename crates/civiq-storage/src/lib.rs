// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Civiq request tracker.
//!
//! One serialized connection (tokio-rusqlite), embedded refinery migrations,
//! and a [`SqliteStore`] implementing the core `Store` trait.

pub mod database;
pub mod migrations;
pub mod queries;
pub mod store;

pub use database::Database;
pub use store::SqliteStore;
