//! Schema-bound tree of JSON values
//!
//! One [`TreeStore`] owns the data of a tree; [`ValidatingNode`]s are cheap
//! handles into it. Child access goes through the [`ChildSlots`] capability
//! set so mapping- and sequence-backed nodes share one code path.

mod container;
mod copy;
mod defaults;
mod node;
mod persistence;
mod slots;
mod store;

pub use node::{CompositionOutcome, Entry, ValidatingNode};
pub use persistence::TreeSnapshot;
pub use slots::{ChildSlots, NodeShape};
pub use store::TreeStore;
