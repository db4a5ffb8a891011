//! Template variable substitution.
//!
//! Walks query text for `$name`, `${name}` and `[[name]]` references and
//! replaces each with the variable's value, formatted by a caller-supplied
//! quoting policy. Text outside a recognized reference is never touched.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::{Captures, Regex};

use crate::models::variable::{ScopedVars, TemplateVariable, VariableValue};

/// Matches `$name`, `[[name]]` and `${name}`.
static VARIABLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(\w+)|\[\[(\w+)\]\]|\$\{(\w+)\}").expect("variable pattern is valid")
});

/// Formats a variable value for insertion into a query.
pub type VariableFormatter<'a> = &'a (dyn Fn(&VariableValue, &TemplateVariable) -> String + Sync);

/// Store of dashboard template variables.
///
/// Hosts implement [`TemplateSrv::variables`]; the substitution walk is
/// provided.
pub trait TemplateSrv: Send + Sync {
    /// Current variables, in dashboard order.
    fn variables(&self) -> Vec<TemplateVariable>;

    /// Replace variable references in `text`.
    ///
    /// `scoped_vars` take precedence over store variables. References to
    /// unknown variables are left as written.
    fn replace(&self, text: &str, scoped_vars: &ScopedVars, formatter: VariableFormatter<'_>) -> String {
        replace_variables(text, &self.variables(), scoped_vars, formatter).into_owned()
    }
}

/// In-memory variable store.
#[derive(Debug, Default)]
pub struct StaticTemplateSrv {
    variables: RwLock<Vec<TemplateVariable>>,
}

impl StaticTemplateSrv {
    /// Create a store holding `variables`.
    pub fn new(variables: Vec<TemplateVariable>) -> Self {
        Self { variables: RwLock::new(variables) }
    }

    /// Add or replace a variable by name.
    pub fn set(&self, variable: TemplateVariable) {
        let mut variables = self.variables.write();
        match variables.iter_mut().find(|existing| existing.name == variable.name) {
            Some(existing) => *existing = variable,
            None => variables.push(variable),
        }
    }
}

impl TemplateSrv for StaticTemplateSrv {
    fn variables(&self) -> Vec<TemplateVariable> {
        self.variables.read().clone()
    }
}

/// Replace every variable reference in `text`.
///
/// Returns the input unchanged (borrowed) when nothing was replaced.
pub fn replace_variables<'t>(
    text: &'t str,
    variables: &[TemplateVariable],
    scoped_vars: &ScopedVars,
    formatter: VariableFormatter<'_>,
) -> Cow<'t, str> {
    VARIABLE_REGEX.replace_all(text, |caps: &Captures<'_>| {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .map_or("", |m| m.as_str());

        let variable = scoped_vars
            .get(name)
            .or_else(|| variables.iter().find(|variable| variable.name == name));

        match variable {
            Some(variable) => format_variable(variable, formatter),
            None => caps[0].to_string(),
        }
    })
}

fn format_variable(variable: &TemplateVariable, formatter: VariableFormatter<'_>) -> String {
    if variable.include_all && variable.value.is_all() {
        if let Some(all_value) = &variable.all_value {
            return all_value.clone();
        }
        return formatter(&VariableValue::Multi(variable.options.clone()), variable);
    }
    formatter(&variable.value, variable)
}

/// Quoting policy for KQL.
///
/// - Single strings are quoted only for multi-value or "All" variables, so
///   authors control quoting of single-select variables themselves.
/// - Numbers are inserted as-is.
/// - Several values are quoted and escaped one by one, then joined with
///   commas; empty values are dropped.
pub fn interpolate_variable(value: &VariableValue, variable: &TemplateVariable) -> String {
    match value {
        VariableValue::Text(text) => {
            if variable.multi || variable.include_all {
                format!("'{text}'")
            } else {
                text.clone()
            }
        }
        VariableValue::Number(number) => number.to_string(),
        VariableValue::Multi(values) => values
            .iter()
            .map(|value| format!("'{}'", escape_special(value)))
            .filter(|quoted| quoted != "''")
            .collect::<Vec<_>>()
            .join(","),
    }
}

/// Escape single quotes for use inside a KQL string literal.
pub fn escape_special(value: &str) -> String {
    value.replace('\'', "\\'")
}
