pub mod routes;
pub mod startup;
pub mod errors;
pub mod extract;

pub use startup::{load_config, run};
