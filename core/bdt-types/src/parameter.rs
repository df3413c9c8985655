//! Typed parameter values configured on a benefit's eligibility checks.

use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Parameter values of one check configuration, keyed by parameter key.
pub type ParameterValues = BTreeMap<String, ParameterValue>;

/// Declared type of a check parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    String,
    Number,
    Boolean,
    Date,
    Select,
    MultiInputString,
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Select => "select",
            Self::MultiInputString => "multi_input_string",
        };
        f.write_str(name)
    }
}

/// A single parameter value.
///
/// Values are untagged on the wire and kept in the exact form the server
/// sent: numbers keep their JSON representation (`60` is written back as
/// `60`, not `60.0`) and dates stay strings, so `"2024-1-5"` is never
/// rewritten as `"2024-01-05"`. Use [`as_date`](Self::as_date) to read a
/// date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Boolean(bool),
    Number(serde_json::Number),
    String(String),
    StringArray(Vec<String>),
}

/// Wire format of dates entered through forms.
const DATE_FORMAT: &str = "%Y-%m-%d";

impl ParameterValue {
    /// Builds a number value. Returns `None` for NaN and infinities, which
    /// JSON cannot represent.
    pub fn number(value: f64) -> Option<Self> {
        serde_json::Number::from_f64(value).map(Self::Number)
    }

    /// Builds a date value in `YYYY-MM-DD` form.
    pub fn date(date: NaiveDate) -> Self {
        Self::String(date.format(DATE_FORMAT).to_string())
    }

    /// Short name of the value's runtime type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::StringArray(_) => "string_array",
        }
    }

    /// Returns whether this value is acceptable for a parameter declared with
    /// type `ty`. Date parameters accept any string that reads as a date.
    pub fn conforms_to(&self, ty: ParameterType) -> bool {
        match (self, ty) {
            (Self::Boolean(_), ParameterType::Boolean)
            | (Self::Number(_), ParameterType::Number)
            | (Self::String(_), ParameterType::String | ParameterType::Select)
            | (Self::StringArray(_), ParameterType::MultiInputString) => true,
            (Self::String(_), ParameterType::Date) => self.as_date().is_some(),
            _ => false,
        }
    }

    /// Checks the value against a declared type.
    pub fn expect_type(&self, ty: ParameterType) -> Result<()> {
        if self.conforms_to(ty) {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                expected: ty,
                actual: self.type_name(),
            })
        }
    }

    /// Parses raw form input into a value of the declared type.
    ///
    /// Multi-input strings are comma separated; surrounding whitespace and
    /// empty items are dropped. Dates are validated and normalized to
    /// `YYYY-MM-DD`.
    pub fn parse(ty: ParameterType, raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        match ty {
            ParameterType::String | ParameterType::Select => Ok(Self::String(raw.to_string())),
            ParameterType::Number => {
                if let Ok(int) = trimmed.parse::<i64>() {
                    return Ok(Self::Number(int.into()));
                }
                trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(Self::number)
                    .ok_or_else(|| Error::InvalidNumber(raw.to_string()))
            }
            ParameterType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "yes" => Ok(Self::Boolean(true)),
                "false" | "no" => Ok(Self::Boolean(false)),
                _ => Err(Error::InvalidBoolean(raw.to_string())),
            },
            ParameterType::Date => Ok(Self::date(NaiveDate::parse_from_str(trimmed, DATE_FORMAT)?)),
            ParameterType::MultiInputString => Ok(Self::StringArray(
                raw.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
        }
    }

    /// Reads a string value as a date.
    pub fn as_date(&self) -> Option<NaiveDate> {
        self.as_str()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<String>> for ParameterValue {
    fn from(value: Vec<String>) -> Self {
        Self::StringArray(value)
    }
}

impl From<NaiveDate> for ParameterValue {
    fn from(value: NaiveDate) -> Self {
        Self::date(value)
    }
}
