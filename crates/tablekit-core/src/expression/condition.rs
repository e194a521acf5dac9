//! Boolean condition merging.

/// Boolean joiner between two condition fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Joiner {
    And,
    Or,
}

impl Joiner {
    fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// Merge two condition fragments into one expression.
///
/// Both fragments are trimmed. They are joined with `AND` unless `b` opens
/// with an explicit `AND`/`OR` joiner, in which case that joiner is kept. The
/// result never starts with a joiner, and an empty side yields the other side
/// unchanged. Repeated fragments are not de-duplicated.
///
/// # Examples
///
/// ```
/// use tablekit_core::merge_condition;
///
/// assert_eq!(merge_condition("#a = :a", "#b = :b"), "#a = :a AND #b = :b");
/// assert_eq!(merge_condition("#a = :a", "OR #b = :b"), "#a = :a OR #b = :b");
/// assert_eq!(merge_condition("", "AND #b = :b"), "#b = :b");
/// ```
#[must_use]
pub fn merge_condition(a: &str, b: &str) -> String {
    let (_, a) = split_joiner(a.trim());
    let (joiner, b) = split_joiner(b.trim());

    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.to_owned(),
        (false, true) => a.to_owned(),
        (false, false) => {
            let joiner = joiner.unwrap_or(Joiner::And);
            format!("{a} {} {b}", joiner.as_str())
        }
    }
}

/// Split a leading `AND`/`OR` token (case-insensitive) from a trimmed fragment.
///
/// The joiner must be a whole word: `ORDER = :o` does not start with `OR`.
fn split_joiner(fragment: &str) -> (Option<Joiner>, &str) {
    for (word, joiner) in [("AND", Joiner::And), ("OR", Joiner::Or)] {
        let Some(head) = fragment.get(..word.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(word) {
            continue;
        }
        let rest = &fragment[word.len()..];
        let boundary = rest
            .chars()
            .next()
            .is_none_or(|c| c.is_ascii_whitespace() || c == '(');
        if boundary {
            return (Some(joiner), rest.trim_start());
        }
    }
    (None, fragment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_join_with_and_by_default() {
        let a = "  #pk = :pk ";
        let b = " begins_with(#sk, :sk)";
        assert_eq!(
            merge_condition(a, b),
            format!("{} AND {}", a.trim(), b.trim())
        );
    }

    #[test]
    fn test_should_preserve_explicit_or_without_duplicating() {
        let merged = merge_condition("attribute_not_exists(#__ts)", "OR #__ts = :__ts");
        assert_eq!(merged, "attribute_not_exists(#__ts) OR #__ts = :__ts");
        assert_eq!(merged.matches(" OR ").count(), 1);
    }

    #[test]
    fn test_should_preserve_explicit_and() {
        assert_eq!(merge_condition("#a = :a", "and #b = :b"), "#a = :a AND #b = :b");
    }

    #[test]
    fn test_should_strip_leading_joiner_when_first_side_empty() {
        assert_eq!(merge_condition("", "OR #b = :b"), "#b = :b");
        assert_eq!(merge_condition("   ", "  #b = :b  "), "#b = :b");
    }

    #[test]
    fn test_should_strip_leading_joiner_from_first_side() {
        assert_eq!(merge_condition("AND #a = :a", "#b = :b"), "#a = :a AND #b = :b");
    }

    #[test]
    fn test_should_return_first_side_when_second_empty() {
        assert_eq!(merge_condition(" #a = :a ", ""), "#a = :a");
        assert_eq!(merge_condition("#a = :a", "OR"), "#a = :a");
        assert_eq!(merge_condition("", ""), "");
    }

    #[test]
    fn test_should_not_treat_word_prefix_as_joiner() {
        assert_eq!(merge_condition("#a = :a", "ORDER = :o"), "#a = :a AND ORDER = :o");
        assert_eq!(merge_condition("#a = :a", "ANDROID = :x"), "#a = :a AND ANDROID = :x");
    }

    #[test]
    fn test_should_accept_parenthesized_group_after_joiner() {
        assert_eq!(
            merge_condition("#a = :a", "OR(#b = :b AND #c = :c)"),
            "#a = :a OR (#b = :b AND #c = :c)"
        );
    }

    #[test]
    fn test_should_stay_equivalent_under_repeated_application() {
        let once = merge_condition("#a = :a", "#b = :b");
        let twice = merge_condition(&once, "#b = :b");
        assert_eq!(twice, "#a = :a AND #b = :b AND #b = :b");
    }
}
