//! Ordering of autocomplete candidates.

/// Sort `values` so the best matches for `search_text` come first.
///
/// Empty values lead, then values starting with the text, then values
/// containing it further in, then everything else. Matching ignores case
/// and the order within each group is preserved.
pub fn sort_starts_with_values_first(values: &mut [String], search_text: &str) {
    let text = search_text.to_lowercase();
    values.sort_by_cached_key(|value| match_rank(value, &text));
}

fn match_rank(value: &str, text: &str) -> u8 {
    if value.is_empty() {
        return 0;
    }
    let lower = value.to_lowercase();
    if lower.starts_with(text) {
        1
    } else if lower
        .chars()
        .next()
        .is_some_and(|first| lower[first.len_utf8()..].contains(text))
    {
        2
    } else {
        3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(values: &[&str], text: &str) -> Vec<String> {
        let mut values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        sort_starts_with_values_first(&mut values, text);
        values
    }

    #[test]
    fn test_starts_with_first() {
        assert_eq!(
            sorted(&["other", "xlog", "Logs", "", "log_errors", "syslog"], "log"),
            vec!["", "Logs", "log_errors", "xlog", "syslog", "other"]
        );
    }

    #[test]
    fn test_order_within_group_is_stable() {
        assert_eq!(sorted(&["b", "a", "c"], "z"), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_non_ascii_values() {
        assert_eq!(sorted(&["été", "Étude"], "ét"), vec!["été", "Étude"]);
    }
}
