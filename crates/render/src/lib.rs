//! Rendering adapter: renderer-agnostic interface.
//!
//! # Invariants
//! - Renderers read a level, never mutate it.
//! - Renderable entities are drawn in `renderable` collection order, so a
//!   higher `sort` lands on top.

mod renderer;

pub use renderer::{AsciiRenderer, RenderView, Renderer};
