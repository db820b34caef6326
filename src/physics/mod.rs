pub mod gravity;

pub use gravity::{J2_EARTH, MU_EARTH, R_EARTH};
