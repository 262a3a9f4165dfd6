pub mod address;
pub mod allocate;
pub mod common;
pub mod config;
pub mod constants;
pub mod create;
pub mod distribute;
pub mod plan;
pub mod program;
pub mod records;
pub mod retry;
pub mod setup;
