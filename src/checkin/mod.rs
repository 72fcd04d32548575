pub mod commands;
pub mod controller;
pub mod state;

pub use controller::CheckinController;
pub use state::{FlowSnapshot, Role, Step};
