//! # Quest Graph
//!
//! The "quest backbone" crate - scene nodes, choice edges, and the branching
//! graph that connects them. This crate is the single source of truth for
//! quest structure and does not contain any generation or I/O logic.
//!
//! ## Core Components
//!
//! - **scene**: Scene nodes, choice edges, and terminal endings
//! - **graph**: The arena-style quest graph with validation, path tracing,
//!   and duplicate-branch merging
//! - **logic**: Structured game logic (objects, preconditions, effects)
//!   that can be attached to choices

pub mod graph;
pub mod logic;
pub mod scene;

pub use graph::*;
pub use logic::*;
pub use scene::*;
