pub mod app;
pub mod console;
pub mod state;

pub use app::{ChatApp, UiUpdate};
pub use console::UiCommand;
pub use state::AppState;
