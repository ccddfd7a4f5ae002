//! Data models for Jotter

mod record;
mod settings;

pub use record::{ModifiedBy, Record, APP_VERSION, SCHEMA_VERSION};
pub use settings::{LimitType, Settings, DEFAULT_LIMIT_VALUE};
