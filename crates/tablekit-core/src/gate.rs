//! Optimistic write gate.
//!
//! Every item written through the client carries [`TIMESTAMP_ATTRIBUTE`], the
//! write time in integer milliseconds. A read-modify-write only succeeds when
//! the stored timestamp is still the one that was read, so a concurrent writer
//! turns the second write into a conditional check failure.

use tablekit_model::{AttributeValue, Item, StoreError};

use crate::error::{TableError, TableResult};
use crate::expression::{Placeholders, merge_update};

/// Reserved attribute holding the last write time.
pub const TIMESTAMP_ATTRIBUTE: &str = "__ts";

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A write time strictly after `previous`, so timestamps never move backwards
/// for an item even when the clock does or two writes share a millisecond.
///
/// A stored timestamp of `i64::MAX` has no successor and fails validation.
pub fn next_after(previous: Option<&AttributeValue>) -> TableResult<i64> {
    let now = now_millis();
    match previous.and_then(AttributeValue::as_i64) {
        Some(prev) if prev >= now => prev.checked_add(1).ok_or_else(|| {
            TableError::Transport(StoreError::validation(format!(
                "stored {TIMESTAMP_ATTRIBUTE} value {prev} cannot be advanced"
            )))
        }),
        _ => Ok(now),
    }
}

/// Overwrite the item's write timestamp.
pub fn stamp(item: &mut Item, ts: i64) {
    item.insert(TIMESTAMP_ATTRIBUTE.to_owned(), AttributeValue::number(ts));
}

/// The write timestamp carried by an item, if any.
#[must_use]
pub fn timestamp_of(item: &Item) -> Option<&AttributeValue> {
    item.get(TIMESTAMP_ATTRIBUTE)
}

/// `attribute_not_exists(<partition>)`: refuse to replace an existing item.
pub fn create_guard(placeholders: &mut Placeholders, partition: &str) -> String {
    let name = placeholders.name(partition);
    format!("attribute_not_exists({name})")
}

/// Guard for a write based on a prior read.
///
/// With a read timestamp the stored one must be absent or equal to it. When
/// the read item had none, only an item that still has none is accepted.
pub fn concurrency_guard(placeholders: &mut Placeholders, read: Option<&AttributeValue>) -> String {
    let name = placeholders.name(TIMESTAMP_ATTRIBUTE);
    match read {
        Some(ts) => {
            let value = placeholders.value("__ts_read", ts.clone());
            format!("attribute_not_exists({name}) OR {name} = {value}")
        }
        None => format!("attribute_not_exists({name})"),
    }
}

/// Guard for a delete of an item last seen with timestamp `read`.
pub fn delete_guard(placeholders: &mut Placeholders, read: &AttributeValue) -> String {
    let name = placeholders.name(TIMESTAMP_ATTRIBUTE);
    let value = placeholders.value("__ts_read", read.clone());
    format!("{name} = {value}")
}

/// Merge `SET __ts = <ts>` into a caller's update expression.
pub fn stamp_update(placeholders: &mut Placeholders, expression: &str, ts: i64) -> String {
    let name = placeholders.name(TIMESTAMP_ATTRIBUTE);
    let value = placeholders.value(TIMESTAMP_ATTRIBUTE, AttributeValue::number(ts));
    merge_update(expression, &format!("SET {name} = {value}"))
}
