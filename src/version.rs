//! Schema versioning.
//!
//! A stream may carry a [`Version`] in its header. Members can be gated on the
//! active version through `since`, `until` or explicit `version(...)`
//! annotations; a gated-out member is left out of the mapping list, so its bytes
//! are neither written nor expected.
//!
//! ```rust
//! use mapcode::{Comparison, Version};
//!
//! let since_two = Version::at_least(2.0);
//! assert!(since_two.is_supported(Some(2.0), false));
//! assert!(!since_two.is_supported(Some(1.0), false));
//! assert!(since_two.is_supported(None, true));
//! assert_eq!(since_two.comparison(), Comparison::GreaterThanOrEqual);
//! ```

use std::fmt;

use crate::error::{DataError, MapcodeError, Result};
use crate::format::VERSION_MARKER;
use crate::io::{BinaryReader, BinaryWriter};

/// The operator a [`Version`] applies when it is checked against another value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Comparison {
    /// `other == value`
    #[default]
    Equal,
    /// `other > value`
    GreaterThan,
    /// `other >= value`
    GreaterThanOrEqual,
    /// `other < value`
    LessThan,
    /// `other <= value`
    LessThanOrEqual,
}

impl Comparison {
    /// The name written to the stream header.
    pub fn name(self) -> &'static str {
        match self {
            Self::Equal => "Equal",
            Self::GreaterThan => "GreaterThan",
            Self::GreaterThanOrEqual => "GreaterThanOrEqual",
            Self::LessThan => "LessThan",
            Self::LessThanOrEqual => "LessThanOrEqual",
        }
    }

    /// Parses a header name written by [`Comparison::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Equal" => Some(Self::Equal),
            "GreaterThan" => Some(Self::GreaterThan),
            "GreaterThanOrEqual" => Some(Self::GreaterThanOrEqual),
            "LessThan" => Some(Self::LessThan),
            "LessThanOrEqual" => Some(Self::LessThanOrEqual),
            _ => None,
        }
    }

    /// Parses an operator symbol (`==`, `>`, `>=`, `<`, `<=`).
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "==" | "=" => Some(Self::Equal),
            ">" => Some(Self::GreaterThan),
            ">=" => Some(Self::GreaterThanOrEqual),
            "<" => Some(Self::LessThan),
            "<=" => Some(Self::LessThanOrEqual),
            _ => None,
        }
    }

    /// Evaluates `lhs OP rhs`. `None` when the operands are not comparable (NaN).
    pub fn evaluate(self, lhs: f64, rhs: f64) -> Option<bool> {
        let ordering = lhs.partial_cmp(&rhs)?;
        Some(match self {
            Self::Equal => ordering.is_eq(),
            Self::GreaterThan => ordering.is_gt(),
            Self::GreaterThanOrEqual => ordering.is_ge(),
            Self::LessThan => ordering.is_lt(),
            Self::LessThanOrEqual => ordering.is_le(),
        })
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A schema version: a number plus the operator used when it gates a member.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Version {
    value: f64,
    comparison: Comparison,
}

impl Version {
    /// Creates a version.
    pub const fn new(value: f64, comparison: Comparison) -> Self {
        Self { value, comparison }
    }

    /// A gate that admits `other >= value`.
    pub const fn at_least(value: f64) -> Self {
        Self::new(value, Comparison::GreaterThanOrEqual)
    }

    /// A gate that admits `other <= value`.
    pub const fn at_most(value: f64) -> Self {
        Self::new(value, Comparison::LessThanOrEqual)
    }

    /// A version compared by equality.
    pub const fn exactly(value: f64) -> Self {
        Self::new(value, Comparison::Equal)
    }

    /// The numeric value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// The comparison operator.
    pub fn comparison(&self) -> Comparison {
        self.comparison
    }

    /// Evaluates `other OP self.value`.
    ///
    /// Returns `default_on_incomparable` when `other` is missing or either side
    /// is NaN.
    pub fn is_supported(&self, other: Option<f64>, default_on_incomparable: bool) -> bool {
        other
            .and_then(|other| self.comparison.evaluate(other, self.value))
            .unwrap_or(default_on_incomparable)
    }

    pub(crate) fn key(&self) -> VersionKey {
        VersionKey(self.value.to_bits(), self.comparison)
    }
}

impl From<f64> for Version {
    fn from(value: f64) -> Self {
        Self::exactly(value)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.value, self.comparison)
    }
}

/// Hashable identity of a version, used in cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct VersionKey(u64, Comparison);

/// Decides whether a member with the given gates is present under `active`.
///
/// Every gate must admit the active version. With no active version every
/// member is present.
pub fn is_member_present(gates: &[Version], active: Option<Version>) -> bool {
    let active = active.map(|v| v.value());
    gates.iter().all(|gate| gate.is_supported(active, true))
}

/// Writes the stream header: marker, presence flag, then value and operator name
/// if a version is configured.
pub fn write_version(writer: &mut BinaryWriter<'_>, version: Option<Version>) -> Result<()> {
    writer.write_raw(&VERSION_MARKER)?;
    writer.write_bool(version.is_some())?;
    if let Some(version) = version {
        writer.write_f64(version.value)?;
        writer.write_string(version.comparison.name())?;
    }
    Ok(())
}

/// Reads the stream header.
///
/// Never fails: a missing marker or any read error leaves the reader where it
/// started and reports the stream as unversioned.
pub fn read_version(reader: &mut BinaryReader<'_>) -> Option<Version> {
    let start = reader.position();
    match try_read_version(reader) {
        Ok(Some(Some(version))) => {
            log::trace!("stream declares version {version}");
            Some(version)
        }
        Ok(Some(None)) => {
            log::trace!("stream declares no version");
            None
        }
        Ok(None) => {
            reader.rewind_to(start);
            log::trace!("stream has no version marker");
            None
        }
        Err(e) => {
            reader.rewind_to(start);
            log::warn!("unreadable version header, treating stream as unversioned: {e}");
            None
        }
    }
}

/// `Ok(None)`: no marker. `Ok(Some(v))`: header read, `v` is its (optional) version.
fn try_read_version(reader: &mut BinaryReader<'_>) -> Result<Option<Option<Version>>> {
    if reader.remaining() < VERSION_MARKER.len() as u64 {
        return Ok(None);
    }
    if reader.read_raw(VERSION_MARKER.len())? != VERSION_MARKER {
        return Ok(None);
    }
    if !reader.read_bool()? {
        return Ok(Some(None));
    }
    let value = reader.read_f64()?;
    let name = reader.read_string()?;
    let comparison = Comparison::from_name(&name).ok_or_else(|| {
        MapcodeError::Data(DataError::InvalidString(format!(
            "unknown comparison '{name}'"
        )))
    })?;
    Ok(Some(Some(Version::new(value, comparison))))
}
