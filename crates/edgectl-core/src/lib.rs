//! edgectl core - distribution data model and the config mapper
//!
//! This crate is pure: no I/O beyond loading a configuration file.
//! - `DistributionConfig`: the declarative configuration a user writes
//! - `DistributionRecord`: the normalized wire record the control plane stores
//! - `expand` / `flatten`: the two directions of the mapping
//! - `identity`: content-derived identity for unordered collections
//! - `validate`: every structural rule a configuration must satisfy

pub mod config;
pub mod enums;
pub mod error;
pub mod expand;
pub mod flatten;
pub mod identity;
pub mod record;
pub mod validate;

#[cfg(test)]
mod testing;

pub use config::DistributionConfig;
pub use enums::{DistributionStatus, UnknownSymbol};
pub use error::{MapperError, Result};
pub use expand::expand;
pub use flatten::flatten;
pub use identity::{ContentId, SetIdentity};
pub use record::{Counted, Distribution, DistributionOutput, DistributionRecord, Tags, Toggled};
pub use validate::{validate, FieldGroup, Violation};
