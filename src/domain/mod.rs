//! Domain layer: pure business rules, no I/O. Everything here is exercised
//! through the ports in [`crate::ports`] and wired up by the adapters.

pub mod subscription;
