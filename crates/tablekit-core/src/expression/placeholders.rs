//! Generation of `#name` and `:value` substitution tokens.

use tablekit_model::AttributeValue;
use tablekit_model::types::{ExpressionAttributeNames, ExpressionAttributeValues};

/// Builder for expression attribute name and value maps.
///
/// Caller-supplied entries are absorbed first and never overwritten; a
/// generated token that would clash with one gets a numeric suffix instead.
#[derive(Debug, Clone, Default)]
pub struct Placeholders {
    names: ExpressionAttributeNames,
    values: ExpressionAttributeValues,
}

impl Placeholders {
    /// Start from the caller's own substitution maps.
    #[must_use]
    pub fn with_caller(names: ExpressionAttributeNames, values: ExpressionAttributeValues) -> Self {
        Self { names, values }
    }

    /// Token naming `attribute`, reusing an existing token that maps to it.
    pub fn name(&mut self, attribute: &str) -> String {
        let base = format!("#{}", sanitize(attribute));
        let mut token = base.clone();
        let mut suffix = 1;
        loop {
            match self.names.get(&token) {
                Some(existing) if existing == attribute => return token,
                Some(_) => {
                    token = format!("{base}_{suffix}");
                    suffix += 1;
                }
                None => {
                    self.names.insert(token.clone(), attribute.to_owned());
                    return token;
                }
            }
        }
    }

    /// Token carrying `value`, derived from `hint` and reused when an
    /// identical value is already bound under it.
    pub fn value(&mut self, hint: &str, value: AttributeValue) -> String {
        let base = format!(":{}", sanitize(hint));
        let mut token = base.clone();
        let mut suffix = 1;
        loop {
            match self.values.get(&token) {
                Some(existing) if *existing == value => return token,
                Some(_) => {
                    token = format!("{base}_{suffix}");
                    suffix += 1;
                }
                None => {
                    self.values.insert(token.clone(), value);
                    return token;
                }
            }
        }
    }

    /// Consume the builder, returning the name and value maps.
    #[must_use]
    pub fn into_parts(self) -> (ExpressionAttributeNames, ExpressionAttributeValues) {
        (self.names, self.values)
    }
}

/// Placeholder tokens only admit `[A-Za-z0-9_]`.
fn sanitize(attribute: &str) -> String {
    let cleaned: String = attribute
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "_".to_owned()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_should_reuse_token_for_same_attribute() {
        let mut ph = Placeholders::default();
        assert_eq!(ph.name("pk"), "#pk");
        assert_eq!(ph.name("pk"), "#pk");
        let (names, _) = ph.into_parts();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_should_sanitize_attribute_names() {
        let mut ph = Placeholders::default();
        assert_eq!(ph.name("user-id"), "#user_id");
        assert_eq!(ph.name("user.id"), "#user_id_1");
    }

    #[test]
    fn test_should_not_overwrite_caller_values() {
        let values = HashMap::from([(":pk".to_owned(), AttributeValue::from("theirs"))]);
        let mut ph = Placeholders::with_caller(HashMap::new(), values);
        assert_eq!(ph.value("pk", AttributeValue::from("ours")), ":pk_1");
        assert_eq!(ph.value("pk", AttributeValue::from("theirs")), ":pk");

        let (_, values) = ph.into_parts();
        assert_eq!(values.get(":pk"), Some(&AttributeValue::from("theirs")));
        assert_eq!(values.get(":pk_1"), Some(&AttributeValue::from("ours")));
    }
}
