//! Registrant records parsed from an uploaded CSV buffer

mod parser;

pub use parser::{ParseError, ParsedUpload, parse};

use serde::{Deserialize, Serialize};

/// One registrant row
///
/// `name` is kept exactly as it appeared in column 0; `email` has carriage
/// returns removed. Both are non-blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    pub email: String,
}
