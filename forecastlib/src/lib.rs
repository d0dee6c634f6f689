//! Next-session opening forecast for a stock index from overnight moves in
//! correlated foreign markets.
//!
//! A run is strictly sequential: [`market::Fetcher`] pulls recent daily bars
//! for every configured instrument, [`models::compute_change`] reduces each
//! series to a change record, [`models::OpeningPredictor`] combines the five
//! weighted changes into a predicted open with a band and a confidence score,
//! and [`recorder`] shapes and persists the result. [`pipeline::run`] wires
//! the stages together.

pub mod logging;
pub mod market;
pub mod models;
pub mod pipeline;
pub mod recorder;
pub mod report;
pub mod util;
pub mod yahoo;
