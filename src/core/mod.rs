// src/core/mod.rs — Iteration engine and its leaf components

pub mod defaults;
pub mod engine;
pub mod formats;
pub mod history;
pub mod sequence;
pub mod template;
pub mod types;
pub mod validator;
