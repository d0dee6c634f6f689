pub mod objects;
pub use objects::*;

pub mod helpers;

pub mod chart_api;
pub use chart_api::*;
