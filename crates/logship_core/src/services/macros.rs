//! KQL macro expansion.
//!
//! Supported macros:
//!
//! - `$__contains(col, $var)` -> `col in (<values>)`, or `1 == 1` for "all"
//! - `$__escapeMulti($var)` -> each `'v'` becomes the verbatim literal `@'v'`
//! - `$__timeFilter(col)` -> `col >= datetime(..) and col <= datetime(..)`
//! - `$__from`, `$__to` -> `datetime(..)`
//! - `$__timeInterval` -> `<n>ms`
//!
//! Time macros are expanded only when the context carries a time range, and
//! `$__timeInterval` only when it carries an interval. Otherwise they are
//! left for the backend.

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::models::query::{DataQueryRequest, TimeRange};

/// Column filtered by `$__timeFilter()` when none is given.
pub const DEFAULT_TIME_COLUMN: &str = "TimeGenerated";

static MULTI_VALUE_MACRO_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$__contains\(\s*([^,()]+?)\s*,\s*([^()]*?)\s*\)|\$__escapeMulti\(([^()]*)\)")
        .expect("multi-value macro pattern is valid")
});
static QUOTED_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'(?:[^'\\]|\\.)*'").expect("quoted pattern is valid"));
static TIME_FILTER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$__timeFilter\(([^()]*)\)").expect("timeFilter pattern is valid"));
static FROM_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$__from\b").expect("from pattern is valid"));
static TO_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$__to\b").expect("to pattern is valid"));
static INTERVAL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$__timeInterval\b").expect("timeInterval pattern is valid"));

/// Dashboard context available to macros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MacroContext {
    /// Time range of the panel
    pub range: Option<TimeRange>,
    /// Suggested bucket width in milliseconds
    pub interval_ms: Option<u64>,
}

impl MacroContext {
    /// Context of a query request.
    pub fn from_request(request: &DataQueryRequest) -> Self {
        Self { range: request.range, interval_ms: request.interval_ms }
    }
}

/// Expand macros and substitute variables in the query.
///
/// `substitute` replaces variable references in a piece of text. Every part
/// of the query goes through it exactly once: macro arguments before their
/// expansion, the text between macros as is. Values are never substituted
/// again, so a value that looks like a variable reference stays literal.
pub fn interpolate_kusto_query(
    query: &str,
    substitute: impl Fn(&str) -> String,
    context: &MacroContext,
) -> String {
    if query.is_empty() {
        return String::new();
    }

    let expanded = expand_time_macros(query, context);

    let mut output = String::with_capacity(expanded.len());
    let mut last = 0;
    for caps in MULTI_VALUE_MACRO_REGEX.captures_iter(&expanded) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        output.push_str(&substitute(&expanded[last..whole.start()]));
        output.push_str(&expand_multi_value_macro(&caps, &substitute));
        last = whole.end();
    }
    output.push_str(&substitute(&expanded[last..]));
    output
}

fn expand_multi_value_macro(caps: &Captures<'_>, substitute: &impl Fn(&str) -> String) -> String {
    match (caps.get(1), caps.get(2), caps.get(3)) {
        (Some(column), Some(values), _) => {
            let values = substitute(values.as_str());
            if values.trim().trim_matches('\'').eq_ignore_ascii_case("all") {
                "1 == 1".to_string()
            } else {
                format!("{} in ({})", substitute(column.as_str()), values)
            }
        }
        (_, _, Some(values)) => QUOTED_REGEX.replace_all(&substitute(values.as_str()), "@$0").into_owned(),
        _ => caps[0].to_string(),
    }
}

fn expand_time_macros(query: &str, context: &MacroContext) -> String {
    let Some(range) = context.range else {
        return query.to_string();
    };
    let from = datetime_literal(range.from);
    let to = datetime_literal(range.to);

    let expanded = TIME_FILTER_REGEX.replace_all(query, |caps: &Captures<'_>| {
        let column = match caps[1].trim() {
            "" => DEFAULT_TIME_COLUMN,
            column => column,
        };
        format!("{column} >= {from} and {column} <= {to}")
    });
    let expanded = FROM_REGEX.replace_all(&expanded, from.as_str());
    let expanded = TO_REGEX.replace_all(&expanded, to.as_str());

    match context.interval_ms {
        Some(interval_ms) => INTERVAL_REGEX.replace_all(&expanded, format!("{interval_ms}ms")).into_owned(),
        None => expanded.into_owned(),
    }
}

fn datetime_literal(time: DateTime<Utc>) -> String {
    format!("datetime({})", time.to_rfc3339_opts(SecondsFormat::Millis, true))
}
