pub mod pattern;
pub mod types;
pub mod universe;

pub use pattern::{AnalysisVerdict, PointMark, StructureOutcome, StructureParams, StructurePoints};
pub use types::{Fundamentals, Interval, PriceBar, PriceSeries, RawBar};
