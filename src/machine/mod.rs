//! The machine layer: transitions, tables, and the hierarchical dispatcher.

mod error;
mod hsm;
mod table;
mod transition;

pub use error::EngineError;
pub use hsm::Hsm;
pub use table::TransitionTable;
pub use transition::{Transition, TransitionDef};

pub(crate) use hsm::{MachineNode, Node, NodeKind};
