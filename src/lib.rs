//! Exact guillotine strip packing: the shortest strip of a given width that
//! holds a multiset of rectangular details, and a cutting plan that achieves it.

pub mod error;
pub mod kit;
pub mod plan;
pub mod render;
pub mod solver;
pub mod types;

pub use error::{Error, Result};
pub use kit::{Kit, SubsetRef};
pub use plan::{Cut, Instruction};
pub use solver::{INFEASIBLE, Solution, Solver, SolverConfig};
pub use types::{CutPositions, Offset, Placement, Rect};
