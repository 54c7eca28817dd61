use std::convert::TryInto;
use std::fmt::Display;
use std::ops::Deref;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CODE_LENGTH: usize = 6;

/// A complete one-time-password code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Code {
    #[serde(with = "serialize_code")]
    code: [u8; CODE_LENGTH],
}

impl Deref for Code {
    type Target = [u8; CODE_LENGTH];

    fn deref(&self) -> &Self::Target {
        &self.code
    }
}

/// (De)serialisation for OTP codes as digit strings.
mod serialize_code {
    use serde::{
        de::{Error, Unexpected, Visitor},
        Deserializer, Serializer,
    };

    use super::CODE_LENGTH;

    pub fn serialize<S>(code: &[u8; CODE_LENGTH], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&code.iter().map(|n| (n + 48) as char).collect::<String>())
    }

    struct StrVisitor;

    impl<'de> Visitor<'de> for StrVisitor {
        type Value = [u8; CODE_LENGTH];

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(formatter, "a string of {} digits", CODE_LENGTH)
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: Error,
        {
            v.parse::<super::Code>()
                .map(|code| *code)
                .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; CODE_LENGTH], D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(StrVisitor)
    }
}

impl Display for Code {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            self.code
                .iter()
                .map(|digit| char::from_digit(*digit as u32, 10).unwrap())
                .collect::<String>()
        )
    }
}

impl FromStr for Code {
    type Err = ParseError;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let len = string.chars().count();
        if len != CODE_LENGTH {
            return Err(Self::Err::InvalidLength(len));
        }
        let digits = string
            .chars()
            .map(|c| match c {
                '0'..='9' => Ok(c as u8 - 48),
                _ => Err(Self::Err::InvalidChar(c)),
            })
            .collect::<Result<Vec<u8>, Self::Err>>()?;
        Ok(Self {
            code: digits.try_into().unwrap(), // Valid because digits.len() == CODE_LENGTH
        })
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("code must contain exactly {CODE_LENGTH} characters")]
    InvalidLength(usize),
    #[error("code must contain only digits")]
    InvalidChar(char),
}

impl From<ParseError> for crate::error::Error {
    fn from(err: ParseError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// The voter-keystroke buffer behind the code input: one slot per digit,
/// filled and cleared independently.
///
/// Slot updates return a focus hint so a front-end can move its caret the
/// way voters expect; the buffer itself tracks no focus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeEntry {
    digits: [Option<u8>; CODE_LENGTH],
}

impl CodeEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a keystroke to the given slot. Only an empty string (clear) or
    /// a single decimal digit is accepted; any other input leaves the buffer
    /// untouched and returns no hint. Slots out of range are ignored.
    pub fn set_digit(&mut self, slot: usize, input: &str) -> Option<usize> {
        if slot >= CODE_LENGTH {
            return None;
        }
        match input {
            "" => {
                // Backspace on an already-empty slot hints the previous one.
                if self.digits[slot].take().is_none() {
                    slot.checked_sub(1)
                } else {
                    Some(slot)
                }
            }
            _ => {
                let mut chars = input.chars();
                let digit = chars.next().and_then(|c| c.to_digit(10))?;
                if chars.next().is_some() {
                    return None;
                }
                self.digits[slot] = Some(digit as u8);
                (slot + 1 < CODE_LENGTH).then_some(slot + 1)
            }
        }
    }

    /// True iff every slot holds a digit.
    pub fn is_complete(&self) -> bool {
        self.digits.iter().all(Option::is_some)
    }

    /// The complete code, if every slot is filled.
    pub fn code(&self) -> Option<Code> {
        let mut code = [0; CODE_LENGTH];
        for (target, digit) in code.iter_mut().zip(self.digits.iter()) {
            *target = (*digit)?;
        }
        Some(Code { code })
    }

    pub fn digit(&self, slot: usize) -> Option<u8> {
        self.digits.get(slot).copied().flatten()
    }

    pub fn clear(&mut self) {
        self.digits = [None; CODE_LENGTH];
    }
}
