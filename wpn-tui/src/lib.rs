mod styles;
mod tui;
mod view;

pub use tui::run_dashboard;
