pub mod actor;
pub mod audit;
pub mod blueprint;
pub mod context;
pub mod errors;
pub mod facet;
pub mod facets;
pub mod fs;
pub mod journal;
pub mod logging;
pub mod params;
pub mod plan;
pub mod runner;
pub mod task;
pub mod ui;
pub mod whimbrel_config;
