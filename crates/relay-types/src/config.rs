//! Environment-variable-resolving configuration wrapper.
//!
//! Lets configuration values be specified either as literal values or as
//! references to environment variables, so secrets (execution keypairs, RPC
//! URLs with embedded API keys) can be kept out of the config file on disk:
//!
//! ```json
//! { "solanaExecutionSecretKey": "$SOLANA_EXECUTION_SECRET_KEY" }
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

/// A transparent wrapper that resolves environment variables during deserialization.
///
/// Supports literal values (`"3001"`), simple env references (`"$PORT"`), and
/// braced env references (`"${PORT}"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralOrEnv<T>(T);

impl<T> LiteralOrEnv<T> {
    pub fn from_literal(value: T) -> Self {
        Self(value)
    }

    pub fn into_inner(self) -> T {
        self.0
    }

    fn parse_env_var_syntax(s: &str) -> Option<String> {
        if let Some(inner) = s.strip_prefix("${") {
            inner.strip_suffix('}').map(str::to_string)
        } else if let Some(name) = s.strip_prefix('$') {
            if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                Some(name.to_string())
            } else {
                None
            }
        } else {
            None
        }
    }
}

impl<T> Deref for LiteralOrEnv<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for LiteralOrEnv<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<'de, T> Deserialize<'de> for LiteralOrEnv<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let value = if let Some(var_name) = Self::parse_env_var_syntax(&s) {
            std::env::var(&var_name).map_err(|_| {
                serde::de::Error::custom(format!(
                    "environment variable '{}' not found (referenced as '{}')",
                    var_name, s
                ))
            })?
        } else {
            s
        };
        let parsed = value
            .parse::<T>()
            .map_err(|e| serde::de::Error::custom(format!("failed to parse value: {}", e)))?;
        Ok(LiteralOrEnv(parsed))
    }
}

impl<T> Serialize for LiteralOrEnv<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_braced_env_var() {
        unsafe { std::env::set_var("RELAY_TEST_PORT", "4010") };
        let wrapped: LiteralOrEnv<u16> = serde_json::from_str("\"${RELAY_TEST_PORT}\"").unwrap();
        assert_eq!(*wrapped, 4010);
    }

    #[test]
    fn passes_through_literal() {
        let wrapped: LiteralOrEnv<u16> = serde_json::from_str("\"3001\"").unwrap();
        assert_eq!(*wrapped, 3001);
    }
}
