pub mod config;
pub mod formatting;

pub use config::{BooleanFormat, DurationStyle, PlaceholderConfig};
pub use formatting::{DurationFormatter, TimeUnit};
