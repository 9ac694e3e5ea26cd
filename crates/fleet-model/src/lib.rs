//! Core domain types for the bare-metal server lifecycle controller:
//! entities (§3), status enums (§4.4), and the shared error kind (§7).
//!
//! This crate has no I/O of its own — it is depended on by `fleet-db`,
//! `fleet-rpc`, and every component crate, the way `carbide-api-model` sits
//! underneath `carbide-api` and `carbide-api-db`.

pub mod asset;
pub mod change_log;
pub mod error;
pub mod ids;
pub mod network;
pub mod rack;
pub mod server;
pub mod sku;
pub mod status;
pub mod switch;

pub use error::{FleetError, sanitize_stdout};

pub type FleetResult<T> = Result<T, FleetError>;
