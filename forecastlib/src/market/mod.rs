pub mod instrument;
pub use instrument::*;

pub mod bars;
pub use bars::*;

pub mod errors;
pub use errors::*;

pub mod retry;
pub use retry::*;

pub mod provider;
pub use provider::*;

pub mod fetcher;
pub use fetcher::*;

pub mod calendar;
pub use calendar::*;
