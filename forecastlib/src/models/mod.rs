pub mod model_config;
pub mod change_record;
pub mod opening_predictor;

pub use model_config::*;
pub use change_record::*;
pub use opening_predictor::*;
