//! asterix-core: Pure decode + track classification library for ASTERIX
//! CAT048/CAT034 radar recordings.
//!
//! No async, no I/O beyond the config file: lines go in as text, decoded
//! reports and classified tracks come out. Used by `asterix-cli`.

pub mod batch;
pub mod cat034;
pub mod cat048;
pub mod config;
pub mod coord;
pub mod decode;
pub mod export;
pub mod header;
pub mod reader;
pub mod report;
pub mod tracker;
pub mod types;
pub mod uap;

// Re-export commonly used types at crate root
pub use batch::{Batch, BatchOutcome, BatchStats};
pub use coord::{polar_to_geo, Coordinate, RADAR_REFERENCE};
pub use decode::{Category, Decoder};
pub use header::{get_category, parse_header, Fspec, MessageHeader};
pub use reader::OctetReader;
pub use report::*;
pub use tracker::{Track, TrackAggregator, TrackClass, TrackSummary};
pub use types::*;
