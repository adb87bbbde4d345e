//! grc-axum: HTTP surface of the GRC workspace shell.
//!
//! Serves the sidebar menu, path resolution, the workspace context and
//! guarded page navigation over a small JSON API.

pub mod app;
pub mod nav;
pub mod params;
pub mod state;
mod error;
pub use error::ShellError;
pub use state::ShellState;

pub use app::{shell, ShellApp};
