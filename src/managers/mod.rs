// Autoscroll state machines
// Managers hold per-driver state and decide what to send; they never perform I/O.

pub mod page_driver;
pub mod scroll_orchestrator;
pub mod viewport;
