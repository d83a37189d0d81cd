mod detect;
mod report;
mod scan;

pub use detect::{detect, UndetectableVersion, SAMPLE_LINES};
pub use report::summarize;
pub use scan::{scan, ScanConfig};
