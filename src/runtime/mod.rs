// Autoscroll runtime: tokio tasks, timers and message routing
pub mod orchestrator_task;
pub mod page_task;
pub mod timer;
pub mod transport;
