//! Domain records shared by every layer of the planner.

pub mod elements;
pub mod observer;
pub mod target;
pub mod time;

pub use elements::*;
pub use observer::*;
pub use target::*;
pub use time::*;
