//! Adapter trait and provider-agnostic support code for Salvo.

pub mod adapter;
pub mod cost;
pub mod error;
pub mod extras;
pub mod registry;

pub use adapter::Adapter;
pub use cost::estimate_cost;
pub use error::AdapterError;
pub use extras::validate_extras;
pub use registry::{AdapterDyn, AdapterRegistry};
