// Export modules for use in tests
pub mod app;
pub mod digest;
pub mod event_source;
pub mod export;
pub mod filters;
pub mod narration;
pub mod navigation_panel;
pub mod notification;
pub mod panic_handler;
pub mod saved;
pub mod settings;
pub mod share;
pub mod similar;
pub mod speech;
pub mod theme;

pub mod test_utils;

// Re-export main app components
pub use app::{run_app, App, FocusedPanel, ViewMode};
