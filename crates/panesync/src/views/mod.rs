//! View rendering modules

mod pane;

pub use pane::render_pane;
