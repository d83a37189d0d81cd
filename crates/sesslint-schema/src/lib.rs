mod registry;
mod validate;

pub use registry::{Registry, RegistryError, Ruleset};
