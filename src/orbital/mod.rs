pub mod constellation;
pub mod elements;
pub mod propagator;
pub mod state;

pub use constellation::{
    Constellation, ConstellationMember, TrainConstellation, WalkerDeltaConstellation,
};
pub use elements::KeplerianElements;
pub use propagator::{AnalyticalPropagator, NumericalPropagator, Propagator};
pub use state::OrbitalState;
