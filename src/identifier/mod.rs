//! Identifier chains: resolution against the type model and code generation
//!
//! ```text
//! IdentifierChain ──IdentifierResolver──▶ ResolvedChain ──GeneratorFactory──▶ Compiled
//! ```

pub mod generator;
pub mod node;
pub mod resolver;

pub use generator::{GeneratorFactory, NodeGenerator};
pub use node::{IdentifierNode, NodeKind, ResolvedChain};
pub use resolver::IdentifierResolver;
