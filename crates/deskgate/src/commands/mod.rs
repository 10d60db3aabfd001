//! CLI command implementations.

pub(crate) mod address;
pub(crate) mod serve;

pub(crate) use address::AddressArgs;
pub(crate) use serve::ServeArgs;
