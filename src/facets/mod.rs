//! Built-in facets.
//!
//! The engine ships the facets the preparation machinery depends on
//! (`source`, `target`, `actor`) plus the `project` facet, whose submodule
//! augmentation is the canonical example of facet-driven step injection.
//! Technology facets (package managers, VCS, frameworks) register through
//! the same `FacetModule` surface from outside the core.

mod actor;
mod project;
mod source;
mod target;

pub use actor::actor_facet;
pub use project::project_facet;
pub use source::source_facet;
pub use target::target_facet;

use crate::facet::FacetRegistry;

/// A registry preloaded with the built-in facets.
pub fn builtin_registry() -> FacetRegistry {
    let mut registry = FacetRegistry::new();
    registry.register(source_facet());
    registry.register(target_facet());
    registry.register(actor_facet());
    registry.register(project_facet());
    registry
}
