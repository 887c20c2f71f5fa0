//! Wipe methods and the pass sequence each one writes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WipeError};

/// One overwrite pass: a constant byte, or fresh random bytes per chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassPattern {
    Fixed(u8),
    Random,
}

impl PassPattern {
    /// The byte a read-back must find, if the pass can be verified at all.
    pub fn fixed_byte(&self) -> Option<u8> {
        match self {
            PassPattern::Fixed(b) => Some(*b),
            PassPattern::Random => None,
        }
    }
}

impl fmt::Display for PassPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassPattern::Fixed(b) => write!(f, "0x{:02X}", b),
            PassPattern::Random => write!(f, "random"),
        }
    }
}

use PassPattern::{Fixed, Random};

const ZERO_PASSES: [PassPattern; 1] = [Fixed(0x00)];
const RANDOM_PASSES: [PassPattern; 1] = [Random];
const DOD3_PASSES: [PassPattern; 3] = [Fixed(0xFF), Fixed(0x00), Random];

/// Peter Gutmann's 35-pass table.
#[rustfmt::skip]
pub const GUTMANN_PASSES: [PassPattern; 35] = [
    Random, Random, Random, Random,
    Fixed(0x55), Fixed(0xAA), Fixed(0x92), Fixed(0x49), Fixed(0x24),
    Fixed(0x00), Fixed(0x11), Fixed(0x22), Fixed(0x33),
    Fixed(0x44), Fixed(0x55), Fixed(0x66), Fixed(0x77),
    Fixed(0x88), Fixed(0x99), Fixed(0xAA), Fixed(0xBB),
    Fixed(0xCC), Fixed(0xDD), Fixed(0xEE), Fixed(0xFF),
    Fixed(0x92), Fixed(0x49), Fixed(0x24), Fixed(0x6D), Fixed(0xB6), Fixed(0xDB),
    Random, Random, Random, Random,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WipeMethod {
    Zero,
    Random,
    Dod3,
    Nist1,
    Gutmann,
}

impl WipeMethod {
    pub const ALL: [WipeMethod; 5] = [
        WipeMethod::Zero,
        WipeMethod::Random,
        WipeMethod::Dod3,
        WipeMethod::Nist1,
        WipeMethod::Gutmann,
    ];

    /// Identifier used in reports and config files.
    pub fn code(&self) -> &'static str {
        match self {
            WipeMethod::Zero => "ZERO",
            WipeMethod::Random => "RANDOM",
            WipeMethod::Dod3 => "DOD3",
            WipeMethod::Nist1 => "NIST1",
            WipeMethod::Gutmann => "GUTMANN",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WipeMethod::Zero => "Zero Fill (1 Pass)",
            WipeMethod::Random => "Random (1 Pass)",
            WipeMethod::Dod3 => "DoD 5220.22-M (3 Passes)",
            WipeMethod::Nist1 => "NIST SP 800-88 (1 Pass Random)",
            WipeMethod::Gutmann => "Gutmann (35 Passes)",
        }
    }

    /// Ordered pass plan. Never empty.
    pub fn passes(&self) -> &'static [PassPattern] {
        match self {
            WipeMethod::Zero => &ZERO_PASSES,
            // NIST SP 800-88 clear is a single random pass here.
            WipeMethod::Random | WipeMethod::Nist1 => &RANDOM_PASSES,
            WipeMethod::Dod3 => &DOD3_PASSES,
            WipeMethod::Gutmann => &GUTMANN_PASSES,
        }
    }

    pub fn has_fixed_pass(&self) -> bool {
        self.passes().iter().any(|p| p.fixed_byte().is_some())
    }
}

impl fmt::Display for WipeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for WipeMethod {
    type Err = WipeError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        WipeMethod::ALL
            .into_iter()
            .find(|m| m.code().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| WipeError::InvalidMethod(s.to_string()))
    }
}

/// Resolve a method identifier straight to its pass plan.
pub fn plan_for(identifier: &str) -> Result<&'static [PassPattern]> {
    Ok(identifier.parse::<WipeMethod>()?.passes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_lengths() {
        assert_eq!(WipeMethod::Zero.passes().len(), 1);
        assert_eq!(WipeMethod::Random.passes().len(), 1);
        assert_eq!(WipeMethod::Nist1.passes().len(), 1);
        assert_eq!(WipeMethod::Dod3.passes().len(), 3);
        assert_eq!(WipeMethod::Gutmann.passes().len(), 35);
    }

    #[test]
    fn test_dod3_order() {
        assert_eq!(
            WipeMethod::Dod3.passes(),
            &[Fixed(0xFF), Fixed(0x00), Random]
        );
    }

    #[test]
    fn test_nist1_aliases_random() {
        assert_eq!(WipeMethod::Nist1.passes(), WipeMethod::Random.passes());
        assert_eq!(WipeMethod::Random.passes(), &[Random]);
    }

    #[test]
    fn test_gutmann_table() {
        #[rustfmt::skip]
        let expected: Vec<Option<u8>> = vec![
            None, None, None, None,
            Some(0x55), Some(0xAA), Some(0x92), Some(0x49), Some(0x24),
            Some(0x00), Some(0x11), Some(0x22), Some(0x33), Some(0x44), Some(0x55),
            Some(0x66), Some(0x77), Some(0x88), Some(0x99), Some(0xAA), Some(0xBB),
            Some(0xCC), Some(0xDD), Some(0xEE), Some(0xFF),
            Some(0x92), Some(0x49), Some(0x24), Some(0x6D), Some(0xB6), Some(0xDB),
            None, None, None, None,
        ];
        let actual: Vec<Option<u8>> = WipeMethod::Gutmann
            .passes()
            .iter()
            .map(|p| p.fixed_byte())
            .collect();
        assert_eq!(actual, expected);
        assert_eq!(WipeMethod::Gutmann.passes(), WipeMethod::Gutmann.passes());
    }

    #[test]
    fn test_parse_method() {
        assert_eq!("dod3".parse::<WipeMethod>().unwrap(), WipeMethod::Dod3);
        assert_eq!(" GUTMANN ".parse::<WipeMethod>().unwrap(), WipeMethod::Gutmann);
        for m in WipeMethod::ALL {
            assert_eq!(m.code().parse::<WipeMethod>().unwrap(), m);
        }
    }

    #[test]
    fn test_unknown_method() {
        let err = plan_for("SCHNEIER").unwrap_err();
        assert!(matches!(err, WipeError::InvalidMethod(ref s) if s == "SCHNEIER"));
    }

    #[test]
    fn test_fixed_pass_detection() {
        assert!(WipeMethod::Zero.has_fixed_pass());
        assert!(WipeMethod::Dod3.has_fixed_pass());
        assert!(!WipeMethod::Random.has_fixed_pass());
        assert!(!WipeMethod::Nist1.has_fixed_pass());
    }
}
