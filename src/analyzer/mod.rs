use std::path::Path;

use anyhow::Result;

use crate::models::DependencyDecl;

pub mod golang;
pub mod node;
pub mod python;

/// Reads one manifest kind and returns the first-order dependencies it
/// declares. Analyzers never touch the network; registry lookups happen later.
pub trait Analyzer {
    fn analyze(&self, path: &Path) -> Result<Vec<DependencyDecl>>;
}
