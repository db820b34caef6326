pub mod config;
pub mod error;
pub mod instrument;
pub mod io;
pub mod logging;
pub mod mission;
pub mod orbital;
pub mod physics;
pub mod time;

pub use error::{MissionError, Result};
pub use time::JulianDate;
