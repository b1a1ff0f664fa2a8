pub mod connectors;
pub mod constants;
pub mod models;
pub mod session;

pub use connectors::*;
pub use models::*;
