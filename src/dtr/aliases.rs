use std::collections::HashMap;
use std::str::FromStr;

use strum_macros::{Display, EnumString};

use crate::error::AliasError;

/// Logical DTR columns every source collapses into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Field {
    Date,
    TimeIn,
    TimeOut,
    Accomplishment,
}

impl Field {
    pub const REQUIRED: [Field; 2] = [Field::Date, Field::TimeIn];
}

/// Case-insensitive header name → field table.
#[derive(Debug, Clone)]
pub struct HeaderAliases {
    names: HashMap<String, Field>,
}

impl Default for HeaderAliases {
    fn default() -> Self {
        let names = [
            ("date", Field::Date),
            ("timein", Field::TimeIn),
            ("time in", Field::TimeIn),
            ("timeout", Field::TimeOut),
            ("time out", Field::TimeOut),
            ("accomplishment", Field::Accomplishment),
            ("notes", Field::Accomplishment),
        ]
        .into_iter()
        .map(|(name, field)| (name.to_string(), field))
        .collect();

        Self { names }
    }
}

impl HeaderAliases {
    pub fn with_alias(mut self, name: &str, field: Field) -> Self {
        self.names.insert(normalize(name), field);
        self
    }

    /// Apply overrides written as `name=field` pairs separated by `;`,
    /// e.g. `clock in=timein;clock out=timeout`.
    pub fn with_overrides(self, raw: &str) -> Result<Self, AliasError> {
        raw.split(';')
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .try_fold(self, |aliases, pair| {
                let (name, field) = pair
                    .split_once('=')
                    .ok_or_else(|| AliasError::Malformed(pair.to_string()))?;
                let name = name.trim();
                if name.is_empty() {
                    return Err(AliasError::Malformed(pair.to_string()));
                }
                let field = Field::from_str(field.trim())
                    .map_err(|_| AliasError::UnknownField(field.trim().to_string()))?;
                Ok(aliases.with_alias(name, field))
            })
    }

    pub fn resolve(&self, name: &str) -> Option<Field> {
        self.names.get(&normalize(name)).copied()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}
