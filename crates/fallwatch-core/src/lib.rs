//! Fallwatch core: IMU windowing, fall classification and hysteresis, and the
//! per-subject status read model.

pub mod error;
pub mod domain;
pub mod buffer;
pub mod features;
pub mod classifier;
pub mod clock;
pub mod settings;
pub mod fall_state;
pub mod validation;
pub mod status;
pub mod monitor;

pub use error::*;
pub use domain::*;
pub use buffer::*;
pub use features::*;
pub use classifier::*;
pub use clock::*;
pub use settings::*;
pub use fall_state::*;
pub use validation::*;
pub use status::*;
pub use monitor::*;
