pub use crate::base::{
    config::{Config, ConfigOverrides},
    error::PredictError,
    types::{Err, Res, Void},
};
pub use anyhow::anyhow;
pub use tracing::{debug, error, info, instrument, warn};
