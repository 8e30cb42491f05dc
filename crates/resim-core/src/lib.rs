pub mod config;
pub mod constants;
pub mod errors;
pub mod logging;
pub mod model;
pub mod runpath;
pub mod template;

pub use model::RunpathEntry;
pub use runpath::RunpathRegistry;
