// Autoscroll shared type definitions
// Settings, sessions, protocol messages and errors used by both drivers.

pub mod errors;
pub mod protocol;
pub mod session;
pub mod settings;
