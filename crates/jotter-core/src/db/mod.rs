//! Database layer for Jotter

mod connection;
mod migrations;

pub use connection::Database;
