//! Positional astronomy primitives used by the ephemeris and scoring layers.

pub mod coords;
pub mod kepler;
pub mod riseset;

pub use coords::{altitude, angular_separation, horizontal_position, zenith, HorizontalPosition};
pub use kepler::{propagate, AsteroidState, PropagationError};
pub use riseset::{rise_transit_set, RiseTransitSet, Visibility};
