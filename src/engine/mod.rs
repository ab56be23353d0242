//! Convergence engine: resolve, plan, batch, dispatch, verify, retry.

pub mod batch;
pub mod controller;
pub mod plan;
pub mod verify;

pub use controller::LightController;
