use std::fmt;

/// A savings amount is a whole number of units in `[MIN_AMOUNT, MAX_AMOUNT]`.
/// Each value can be used once per calendar year, so a completed year saves
/// `1 + 2 + ... + 365` units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u16);

pub const MIN_AMOUNT: u16 = 1;
pub const MAX_AMOUNT: u16 = 365;

/// Sum of every amount in a single year: 365 * 366 / 2.
pub const YEARLY_TARGET: u32 = (MAX_AMOUNT as u32) * (MAX_AMOUNT as u32 + 1) / 2;

impl Amount {
    /// Wrap a value, returning `None` when it is outside the allowed range.
    pub fn new(value: u16) -> Option<Self> {
        (MIN_AMOUNT..=MAX_AMOUNT)
            .contains(&value)
            .then_some(Self(value))
    }

    pub fn get(self) -> u16 {
        self.0
    }

    /// Every valid amount, ascending.
    pub fn all() -> impl Iterator<Item = Amount> {
        (MIN_AMOUNT..=MAX_AMOUNT).map(Amount)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse user or stored input into an amount.
/// Example: "200" -> 200, " 42 " -> 42, "0" -> OutOfRange, "4.5" -> InvalidFormat
///
/// Only plain digit strings are accepted: no sign, no decimal point, no
/// thousands separators. Digit strings too large for any integer type are
/// reported as out of range rather than malformed.
pub fn parse_amount(input: &str) -> Result<Amount, AmountError> {
    let input = input.trim();
    if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AmountError::InvalidFormat(input.to_string()));
    }

    let value: u64 = input
        .parse()
        .map_err(|_| AmountError::OutOfRange(u64::MAX))?;

    u16::try_from(value)
        .ok()
        .and_then(Amount::new)
        .ok_or(AmountError::OutOfRange(value))
}

/// Returns true when the input means "clear this date".
pub fn is_blank(input: &str) -> bool {
    input.trim().is_empty()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    InvalidFormat(String),
    OutOfRange(u64),
}

impl fmt::Display for AmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountError::InvalidFormat(input) => {
                write!(f, "'{}' is not a whole number", input)
            }
            AmountError::OutOfRange(value) => write!(
                f,
                "{} is outside the allowed range {}-{}",
                value, MIN_AMOUNT, MAX_AMOUNT
            ),
        }
    }
}

impl std::error::Error for AmountError {}
