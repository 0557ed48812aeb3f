pub mod clock;
pub mod document;
pub mod error;
pub mod ids;

pub use clock::{Clock, ManualClock, SystemClock};
pub use document::{Document, DocumentPatch, NewDocument};
pub use error::CoreError;
pub use ids::*;
