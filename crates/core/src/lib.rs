#![forbid(unsafe_code)]

pub mod curriculum;
pub mod grading;
pub mod model;
pub mod navigation;
pub mod progress;
pub mod time;
pub mod video;

pub use time::Clock;
