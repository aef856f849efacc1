//! Physics-based value generators.
//!
//! Unlike tweens, solvers have no fixed duration: they integrate physical
//! state each tick and stop when a rest condition holds. Both implement
//! [`crate::tween::Animate`], so they join the engine's active set next to
//! ordinary tweens.

pub mod inertia;
pub mod spring;

pub use inertia::{Inertia, InertiaOptions};
pub use spring::{Spring, SpringOptions};
