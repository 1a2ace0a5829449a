use std::fmt;

use serde::{Deserialize, Serialize};

/// Money is represented as integer minor units to avoid floating-point drift.
/// For EUR/UAH, 1 unit = 100 minor units, so 50.00 = 5000.
pub type MinorUnits = i64;

/// Largest accepted amount for a single expense, in minor units. Keeps every
/// balance an event can reach far inside the `i64` range.
pub const MAX_AMOUNT: MinorUnits = 1_000_000_000_000_000;

/// Narrow a wide intermediate back to minor units, clamping at the `i64` bounds.
pub(crate) fn saturate(value: i128) -> MinorUnits {
    MinorUnits::try_from(value).unwrap_or(if value > 0 {
        MinorUnits::MAX
    } else {
        MinorUnits::MIN
    })
}

/// A validated three-letter currency code together with its minor-unit exponent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency {
    code: String,
    exponent: u32,
}

/// Currency used when an event is created without one.
pub const DEFAULT_CURRENCY: &str = "UAH";

const ZERO_DECIMAL_CODES: &[&str] = &[
    "CLP", "ISK", "JPY", "KRW", "PYG", "UGX", "VND", "XAF", "XOF",
];
const THREE_DECIMAL_CODES: &[&str] = &["BHD", "IQD", "JOD", "KWD", "LYD", "OMR", "TND"];

impl Currency {
    /// Parse a currency code. Input is trimmed and uppercased.
    pub fn parse(input: &str) -> Result<Self, ParseCurrencyError> {
        let code = input.trim().to_ascii_uppercase();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ParseCurrencyError(input.trim().to_string()));
        }

        let exponent = if ZERO_DECIMAL_CODES.contains(&code.as_str()) {
            0
        } else if THREE_DECIMAL_CODES.contains(&code.as_str()) {
            3
        } else {
            2
        };

        Ok(Self { code, exponent })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Number of decimal places used to render amounts in this currency.
    pub fn exponent(&self) -> u32 {
        self.exponent
    }

    fn scale(&self) -> i64 {
        10_i64.pow(self.exponent)
    }

    /// Format minor units as a decimal string.
    /// Example (2 decimals): 5000 -> "50.00", -1234 -> "-12.34"
    pub fn format_amount(&self, units: MinorUnits) -> String {
        let sign = if units < 0 { "-" } else { "" };
        let abs = units.unsigned_abs();
        let scale = self.scale().unsigned_abs();
        if self.exponent == 0 {
            return format!("{}{}", sign, abs);
        }
        format!(
            "{}{}.{:0width$}",
            sign,
            abs / scale,
            abs % scale,
            width = self.exponent as usize
        )
    }

    /// Like [`Currency::format_amount`] but positive values carry an explicit `+`.
    pub fn format_balance(&self, units: MinorUnits) -> String {
        if units > 0 {
            format!("+{}", self.format_amount(units))
        } else {
            self.format_amount(units)
        }
    }

    /// Parse a decimal string into minor units.
    /// Accepts `.` or `,` as separator; rejects more decimals than the currency has.
    /// Example (2 decimals): "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
    pub fn parse_amount(&self, input: &str) -> Result<MinorUnits, ParseAmountError> {
        let input = input.trim();
        let (negative, digits) = match input.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, input.strip_prefix('+').unwrap_or(input)),
        };

        let normalized = digits.replace(',', ".");
        let (whole, fraction) = match normalized.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (normalized.as_str(), ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(ParseAmountError::InvalidFormat);
        }
        if !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ParseAmountError::InvalidFormat);
        }
        if fraction.len() > self.exponent as usize {
            return Err(ParseAmountError::TooManyDecimals {
                allowed: self.exponent,
            });
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| ParseAmountError::OutOfRange)?
        };
        let padded = format!("{:0<width$}", fraction, width = self.exponent as usize);
        let fraction: i64 = if padded.is_empty() {
            0
        } else {
            padded.parse().map_err(|_| ParseAmountError::InvalidFormat)?
        };

        let units = whole
            .checked_mul(self.scale())
            .and_then(|v| v.checked_add(fraction))
            .ok_or(ParseAmountError::OutOfRange)?;
        if units > MAX_AMOUNT {
            return Err(ParseAmountError::OutOfRange);
        }
        Ok(if negative { -units } else { units })
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self {
            code: DEFAULT_CURRENCY.to_string(),
            exponent: 2,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

impl std::str::FromStr for Currency {
    type Err = ParseCurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = ParseCurrencyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.code
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCurrencyError(pub String);

impl fmt::Display for ParseCurrencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid currency code '{}' (expected 3 letters)", self.0)
    }
}

impl std::error::Error for ParseCurrencyError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    InvalidFormat,
    TooManyDecimals { allowed: u32 },
    OutOfRange,
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::InvalidFormat => write!(f, "invalid money format"),
            ParseAmountError::TooManyDecimals { allowed } => {
                write!(f, "too many decimal places (at most {})", allowed)
            }
            ParseAmountError::OutOfRange => write!(f, "amount is out of range"),
        }
    }
}

impl std::error::Error for ParseAmountError {}
