//! Embassy async tasks

pub mod sweep;
pub mod tick;

pub use sweep::sweep_task;
pub use tick::tick_task;
