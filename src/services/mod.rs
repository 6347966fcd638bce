// Autoscroll services
// Services face the user: the control surface and the persisted default settings.

pub mod control_surface;
pub mod settings_store;
