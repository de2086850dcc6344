//! Sliding-window planning over a region of interest.

mod planner;
mod region;

pub use planner::{PyramidLevel, Window, WindowIter, WindowPlanner, default_step};
pub use region::region_of_interest;
