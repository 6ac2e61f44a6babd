// Export modules for use in tests
pub mod colorize;
pub mod dom;
pub mod effect;
pub mod event_source;
pub mod gateway;
pub mod geometry;
pub mod highlight;
pub mod interactivity;
pub mod lifecycle;
pub mod locator;
pub mod panic_handler;
pub mod popup;
pub mod positioner;
pub mod runtime;
pub mod session;
pub mod settings;
pub mod surface;
pub mod timers;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export the page-session entry points
pub use runtime::ContentScript;
pub use session::{PageEvent, PageSession, SessionOptions};
