pub mod bodies;
pub mod body_graph;
pub mod cache;
pub mod chebyshev;
pub mod config;
pub mod constants;
pub mod earth_orientation;
pub mod frames;
pub mod kernel;
pub mod orrery;
pub mod orrery_errors;
pub mod positions;
pub mod time;
pub mod topos;

pub use bodies::Body;
pub use config::OrreryConfig;
pub use frames::Frame;
pub use kernel::Kernel;
pub use orrery::Orrery;
pub use orrery_errors::{OrreryError, Result};
pub use positions::{FramedVector, Observer, StateVector};
pub use time::{CalendarTime, Instant, TimeScale, TimeScales};
pub use topos::Topos;
