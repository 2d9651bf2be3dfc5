pub mod candidate;
pub mod date;
pub mod result;

pub use candidate::{DateCandidate, PatternKind};
pub use date::{CanonicalDate, DateError, MAX_YEAR, MIN_YEAR};
pub use result::{ExpiryResult, NO_DATE_MESSAGE};
