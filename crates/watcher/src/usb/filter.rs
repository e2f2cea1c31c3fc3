//! VID:PID device filters
//!
//! Filter format: `"0xVID:0xPID"`, with `*` accepted on either side, e.g.
//! `"0x046d:*"` or `"*:*"`. An empty filter set lets every device through.

use std::fmt;
use std::str::FromStr;

/// One side of a filter: an exact ID or a wildcard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdPattern {
    Any,
    Exact(u16),
}

impl IdPattern {
    fn parse(s: &str, name: &str) -> Result<Self, FilterError> {
        if s == "*" {
            return Ok(IdPattern::Any);
        }

        let hex_part = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| {
                FilterError(format!(
                    "Invalid {} '{}', must start with '0x' (e.g., '0x1234')",
                    name, s
                ))
            })?;

        if hex_part.is_empty() || hex_part.len() > 4 {
            return Err(FilterError(format!(
                "Invalid {} '{}', hex part must be 1-4 digits",
                name, s
            )));
        }

        u16::from_str_radix(hex_part, 16)
            .map(IdPattern::Exact)
            .map_err(|_| FilterError(format!("Invalid {} '{}', not a valid hex number", name, s)))
    }

    fn matches(self, id: u16) -> bool {
        match self {
            IdPattern::Any => true,
            IdPattern::Exact(expected) => expected == id,
        }
    }
}

/// Error returned for a malformed filter string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterError(String);

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for FilterError {}

/// A single parsed VID:PID filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFilter {
    vendor: IdPattern,
    product: IdPattern,
}

impl DeviceFilter {
    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor.matches(vendor_id) && self.product.matches(product_id)
    }
}

impl FromStr for DeviceFilter {
    type Err = FilterError;

    fn from_str(filter: &str) -> Result<Self, Self::Err> {
        let (vid, pid) = match filter.split(':').collect::<Vec<_>>()[..] {
            [vid, pid] => (vid, pid),
            _ => {
                return Err(FilterError(format!(
                    "Invalid filter format '{}', expected VID:PID (e.g., '0x1234:0x5678' or '0x1234:*')",
                    filter
                )));
            }
        };

        Ok(Self {
            vendor: IdPattern::parse(vid, "VID")?,
            product: IdPattern::parse(pid, "PID")?,
        })
    }
}

/// A set of filters; a device passes if any filter matches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet(Vec<DeviceFilter>);

impl FilterSet {
    /// Parse every filter string, failing on the first malformed one
    pub fn parse<S: AsRef<str>>(filters: &[S]) -> Result<Self, FilterError> {
        filters
            .iter()
            .map(|f| f.as_ref().parse())
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn allows(&self, vendor_id: u16, product_id: u16) -> bool {
        self.0.is_empty() || self.0.iter().any(|f| f.matches(vendor_id, product_id))
    }
}
