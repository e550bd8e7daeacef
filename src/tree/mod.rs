//! The design tree: arena storage, the model orchestrator, queries, and the
//! property layer.

pub mod model;
pub mod node;
pub mod property;
pub mod query;

pub use model::{DesignModel, ModelError};
pub use node::{NodeData, NodeId};
