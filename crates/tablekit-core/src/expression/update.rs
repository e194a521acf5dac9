//! Section-aware update expression merging.
//!
//! An update expression is a sequence of sections, each introduced by one of
//! the keywords `SET`, `ADD`, `DELETE` or `REMOVE` and holding a
//! comma-separated item list:
//!
//! ```text
//! SET #a = :a, #n = #n + :one REMOVE #old ADD #tags :t
//! ```
//!
//! [`UpdateClauses::parse`] splits such text with a scanner that tracks
//! parenthesis and bracket depth, so commas inside `if_not_exists(#a, :b)` or
//! `list_append(#l, :v)` stay in their item. A keyword only opens a section when
//! it stands alone as a word at depth zero; `:setting` or `#remove` are
//! placeholders, not keywords.

use std::collections::BTreeMap;
use std::fmt;

/// An update expression section, ordered as it is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    /// `SET path = value`.
    Set,
    /// `ADD path value`.
    Add,
    /// `DELETE path value`.
    Delete,
    /// `REMOVE path`.
    Remove,
}

impl Section {
    /// All sections in render order.
    pub const ALL: [Self; 4] = [Self::Set, Self::Add, Self::Delete, Self::Remove];

    /// The section keyword.
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Set => "SET",
            Self::Add => "ADD",
            Self::Delete => "DELETE",
            Self::Remove => "REMOVE",
        }
    }

    /// Match a section keyword, case-insensitively.
    #[must_use]
    pub fn from_keyword(word: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|section| section.keyword().eq_ignore_ascii_case(word))
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// An update expression split into de-duplicated item lists per section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateClauses {
    sections: BTreeMap<Section, Vec<String>>,
}

impl UpdateClauses {
    /// Split an update expression into its sections.
    ///
    /// Items that precede any keyword belong to `SET`. Empty items, such as
    /// the one after a trailing comma, are dropped.
    #[must_use]
    pub fn parse(expr: &str) -> Self {
        let mut clauses = Self::default();
        let chars: Vec<char> = expr.chars().collect();
        let mut current = Section::Set;
        let mut item = String::new();
        let mut depth = 0_usize;
        let mut pos = 0;

        while pos < chars.len() {
            let ch = chars[pos];
            match ch {
                '(' | '[' => {
                    depth += 1;
                    item.push(ch);
                }
                ')' | ']' => {
                    depth = depth.saturating_sub(1);
                    item.push(ch);
                }
                ',' if depth == 0 => clauses.flush(current, &mut item),
                c if depth == 0 && is_word_start(c) && at_word_boundary(&chars, pos) => {
                    let end = word_end(&chars, pos);
                    let word: String = chars[pos..end].iter().collect();
                    let standalone = chars.get(end).is_none_or(|c| c.is_whitespace());
                    match Section::from_keyword(&word) {
                        Some(section) if standalone => {
                            clauses.flush(current, &mut item);
                            current = section;
                        }
                        _ => item.push_str(&word),
                    }
                    pos = end;
                    continue;
                }
                _ => item.push(ch),
            }
            pos += 1;
        }
        clauses.flush(current, &mut item);
        clauses
    }

    fn flush(&mut self, section: Section, item: &mut String) {
        self.insert(section, item);
        item.clear();
    }

    /// Append an item to a section unless it is already present.
    ///
    /// The item is trimmed and runs of whitespace are collapsed before the
    /// textual comparison.
    pub fn insert(&mut self, section: Section, item: &str) {
        let normalized = item.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.is_empty() {
            return;
        }
        let items = self.sections.entry(section).or_default();
        if !items.contains(&normalized) {
            items.push(normalized);
        }
    }

    /// Fold another expression's sections into this one, keeping first-seen order.
    pub fn merge(&mut self, other: &Self) {
        for (section, items) in &other.sections {
            for item in items {
                self.insert(*section, item);
            }
        }
    }

    /// Items of a section, in order.
    #[must_use]
    pub fn items(&self, section: Section) -> &[String] {
        self.sections.get(&section).map_or(&[], Vec::as_slice)
    }

    /// Whether no section carries an item.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.values().all(Vec::is_empty)
    }
}

impl fmt::Display for UpdateClauses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (section, items) in &self.sections {
            if items.is_empty() {
                continue;
            }
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{section} {}", items.join(", "))?;
            first = false;
        }
        Ok(())
    }
}

fn is_word_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// A word starts a token only when not glued to a placeholder sigil, a path
/// separator, or a preceding word character.
fn at_word_boundary(chars: &[char], pos: usize) -> bool {
    pos == 0 || !matches!(chars[pos - 1], c if is_word_char(c) || matches!(c, '#' | ':' | '.'))
}

fn word_end(chars: &[char], start: usize) -> usize {
    chars[start..]
        .iter()
        .position(|c| !is_word_char(*c))
        .map_or(chars.len(), |offset| start + offset)
}

/// Merge two update expressions section by section.
///
/// Matching sections are concatenated and de-duplicated by textual equality,
/// keeping first-seen order. Only non-empty sections are emitted, in the order
/// `SET`, `ADD`, `DELETE`, `REMOVE`. Bare comma lists without a keyword are
/// treated as `SET` items.
///
/// # Examples
///
/// ```
/// use tablekit_core::merge_update;
///
/// assert_eq!(
///     merge_update("SET #a = :a,", "ADD d SET b = :b,c = :c,"),
///     "SET #a = :a, b = :b, c = :c ADD d"
/// );
/// assert_eq!(merge_update("SET a=:a", "SET a=:a"), "SET a=:a");
/// ```
#[must_use]
pub fn merge_update(a: &str, b: &str) -> String {
    let mut clauses = UpdateClauses::parse(a);
    clauses.merge(&UpdateClauses::parse(b));
    let merged = clauses.to_string();
    tracing::trace!(a, b, merged = %merged, "merged update expression");
    merged
}
