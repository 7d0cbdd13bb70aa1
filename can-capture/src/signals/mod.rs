//! Signal definitions
//!
//! Message and signal definitions loaded from DBC files, indexed by CAN ID
//! for the [`crate::DbcDecoder`].

pub mod database;
pub mod dbc;

pub use database::SignalDatabase;
