//! CLI command implementations.
//!
//! | Module   | Commands handled |
//! |----------|------------------|
//! | `run`    | `Run`, `Runs`    |
//! | `plan`   | `Plan`           |
//! | `facets` | `Facets`         |

pub mod facets;
pub mod plan;
pub mod run;

pub use facets::cmd_facets;
pub use plan::cmd_plan;
pub use run::{cmd_run, cmd_runs};
