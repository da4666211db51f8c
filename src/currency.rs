//! The currency code type used for original amounts and base currencies.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::Error;

/// The base currency used when a profile has not chosen one.
pub const DEFAULT_BASE_CURRENCY: &str = "LKR";

/// An ISO 4217 alpha-3 currency code, e.g. "LKR" or "USD".
///
/// Codes are normalised to upper case on construction so that "usd" and
/// "USD" compare equal everywhere else in the app.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Create a currency code from a string.
    ///
    /// # Errors
    /// Returns [Error::InvalidCurrency] if `code` is not three ASCII letters.
    pub fn new(code: &str) -> Result<Self, Error> {
        let code = code.trim();

        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_uppercase()))
        } else {
            Err(Error::InvalidCurrency(code.to_owned()))
        }
    }

    /// The default base currency, used when a profile has not set one.
    pub fn default_base() -> Self {
        Self(DEFAULT_BASE_CURRENCY.to_owned())
    }

    /// The code as a string slice, always upper case.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}
