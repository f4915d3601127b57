//! Message names carried in the attribute block.

use std::fmt;
use std::str::FromStr;

use crate::error::{FrameError, Result};

/// Fully qualified message name, e.g. `afrl.cmasi.AirVehicleState`.
///
/// Only used as attribute text and in diagnostics; never interpreted. The
/// name must be non-empty printable ASCII without `$` or `|`, which delimit
/// the attribute block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageName(String);

impl MessageName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if let Some(reason) = validate(&name) {
            return Err(FrameError::InvalidMessageName { name, reason });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate(name: &str) -> Option<&'static str> {
    if name.is_empty() {
        return Some("must not be empty");
    }
    if name.contains(['$', '|']) {
        return Some("must not contain '$' or '|'");
    }
    if !name.bytes().all(|b| b.is_ascii_graphic()) {
        return Some("must be printable ASCII without whitespace");
    }
    None
}

impl fmt::Display for MessageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MessageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for MessageName {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for MessageName {
    type Error = FrameError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<String> for MessageName {
    type Error = FrameError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}
