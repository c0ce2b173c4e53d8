// src/lib.rs — Library root for workbench

pub mod cli;
pub mod core;
pub mod infra;
pub mod provider;
pub mod util;
