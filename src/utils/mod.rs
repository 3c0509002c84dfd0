pub mod config;
pub(crate) mod constants;
pub mod obs;
pub mod station;
