//! Hardware abstraction traits
//!
//! These traits define the interface between the easing engine
//! and platform-specific implementations.

pub mod timer;
pub mod transport;

pub use timer::{Clock, NoTicks, TickSource};
pub use transport::{Transport, TransportError, UnitSpace, EXPANDER_STEPS_PER_PERIOD};
