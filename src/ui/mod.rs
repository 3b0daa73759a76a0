//! Terminal rendering of plans and run outcomes.

pub mod icons;
mod tree;

pub use tree::{render_step_tree, render_summary};
