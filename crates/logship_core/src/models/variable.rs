//! Template variable models.
//!
//! Variables are owned by the host's template store; this crate only reads
//! them while interpolating queries.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Value the host uses to mark an "All" selection.
pub const ALL_VALUE: &str = "$__all";

/// Current value of a template variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    /// A number
    Number(f64),
    /// A single string
    Text(String),
    /// Several selected strings
    Multi(Vec<String>),
}

impl VariableValue {
    /// Check if this is an "All" selection.
    pub fn is_all(&self) -> bool {
        match self {
            Self::Text(text) => text == ALL_VALUE,
            Self::Multi(values) => values.len() == 1 && values[0] == ALL_VALUE,
            Self::Number(_) => false,
        }
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for VariableValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<Vec<&str>> for VariableValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Multi(values.into_iter().map(String::from).collect())
    }
}

impl From<Vec<String>> for VariableValue {
    fn from(values: Vec<String>) -> Self {
        Self::Multi(values)
    }
}

/// A dashboard template variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateVariable {
    /// Name referenced as `$name`
    pub name: String,
    /// Current selection
    pub value: VariableValue,
    /// Whether several values may be selected
    #[serde(default)]
    pub multi: bool,
    /// Whether the "All" option is offered
    #[serde(default)]
    pub include_all: bool,
    /// Custom value substituted for an "All" selection
    #[serde(default)]
    pub all_value: Option<String>,
    /// Every selectable option, used to expand "All" without a custom value
    #[serde(default)]
    pub options: Vec<String>,
}

impl TemplateVariable {
    /// Create a single-select variable.
    pub fn new(name: impl Into<String>, value: impl Into<VariableValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            multi: false,
            include_all: false,
            all_value: None,
            options: Vec::new(),
        }
    }

    /// Mark the variable as multi-valued.
    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }

    /// Offer the "All" option.
    pub fn include_all(mut self) -> Self {
        self.include_all = true;
        self
    }

    /// Set the custom "All" value.
    pub fn with_all_value(mut self, all_value: impl Into<String>) -> Self {
        self.all_value = Some(all_value.into());
        self
    }

    /// Set the selectable options.
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }
}

/// Variables scoped to a single panel or repeat, overriding store variables.
pub type ScopedVars = HashMap<String, TemplateVariable>;
