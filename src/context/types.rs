/*
 * Responsibility
 * - middleware が request extensions に書き、handler / 後段 middleware が読む型
 *   - ClaimSet: 検証済みトークンの payload
 *   - RequestVars: 名前付きの値 (subject id, tenant id など)
 * - 書き込みは middleware の責務、ここは型 (契約) のみ
 */
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claims of a token that passed verification, as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimSet(Map<String, Value>);

impl ClaimSet {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// String form of a scalar claim: strings as-is, numbers in decimal.
    ///
    /// Objects, arrays, booleans and null give `None`.
    pub fn get_scalar_string(&self, name: &str) -> Option<String> {
        match self.0.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for ClaimSet {
    fn from(claims: Map<String, Value>) -> Self {
        Self(claims)
    }
}

/// Named per-request values shared between middleware.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestVars(HashMap<String, Value>);

impl RequestVars {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// String value of a variable; empty strings count as absent.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }
}
