//! The quantitative core. Every function here is pure: same inputs, same outputs, no I/O.

pub mod allocation;
pub mod assemble;
pub mod entry_zones;
pub mod regime;
pub mod risk;
pub mod stats;

#[cfg(test)]
pub(crate) mod test_support;
