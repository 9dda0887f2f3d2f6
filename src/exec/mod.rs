// src/exec/mod.rs

//! Task execution layer.
//!
//! This module is responsible for actually running the tasks the engine
//! dispatches, and reporting back to the orchestration runtime via
//! `RuntimeEvent`s.
//!
//! - [`task_runner`] handles one task: fingerprint check, toolchain
//!   invocation, output verification, or the built-in clean action.
//! - [`backend`] provides the `ExecutorBackend` trait and a concrete
//!   `RealExecutorBackend` that the runtime uses in production, and which
//!   tests can replace with a fake implementation.

pub mod backend;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use task_runner::{execute_node, ExecContext};
