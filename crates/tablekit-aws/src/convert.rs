//! Conversions between the wire model and AWS SDK types.

use std::collections::HashMap;

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::{
    AttributeValue as SdkAttributeValue, DeleteRequest as SdkDeleteRequest,
    PutRequest as SdkPutRequest, ReturnValue as SdkReturnValue,
    WriteRequest as SdkWriteRequest,
};
use tablekit_model::types::{ReturnValue, WriteRequest};
use tablekit_model::{AttributeValue, Item, StoreError};

/// An item in SDK form.
pub type SdkItem = HashMap<String, SdkAttributeValue>;

/// Convert a model value into its SDK counterpart.
#[must_use]
pub fn to_sdk(value: AttributeValue) -> SdkAttributeValue {
    match value {
        AttributeValue::S(s) => SdkAttributeValue::S(s),
        AttributeValue::N(n) => SdkAttributeValue::N(n),
        AttributeValue::B(b) => SdkAttributeValue::B(Blob::new(b.to_vec())),
        AttributeValue::Ss(v) => SdkAttributeValue::Ss(v),
        AttributeValue::Ns(v) => SdkAttributeValue::Ns(v),
        AttributeValue::Bs(v) => {
            SdkAttributeValue::Bs(v.into_iter().map(|b| Blob::new(b.to_vec())).collect())
        }
        AttributeValue::Bool(b) => SdkAttributeValue::Bool(b),
        AttributeValue::Null(b) => SdkAttributeValue::Null(b),
        AttributeValue::L(list) => SdkAttributeValue::L(list.into_iter().map(to_sdk).collect()),
        AttributeValue::M(map) => SdkAttributeValue::M(item_to_sdk(map)),
    }
}

/// Convert an SDK value into the model.
///
/// Fails on variants the SDK reports as unknown, which happen when the service
/// returns a type newer than the SDK build.
pub fn from_sdk(value: SdkAttributeValue) -> Result<AttributeValue, StoreError> {
    Ok(match value {
        SdkAttributeValue::S(s) => AttributeValue::S(s),
        SdkAttributeValue::N(n) => AttributeValue::N(n),
        SdkAttributeValue::B(b) => AttributeValue::B(bytes::Bytes::from(b.into_inner())),
        SdkAttributeValue::Ss(v) => AttributeValue::Ss(v),
        SdkAttributeValue::Ns(v) => AttributeValue::Ns(v),
        SdkAttributeValue::Bs(v) => AttributeValue::Bs(
            v.into_iter()
                .map(|b| bytes::Bytes::from(b.into_inner()))
                .collect(),
        ),
        SdkAttributeValue::Bool(b) => AttributeValue::Bool(b),
        SdkAttributeValue::Null(b) => AttributeValue::Null(b),
        SdkAttributeValue::L(list) => {
            AttributeValue::L(list.into_iter().map(from_sdk).collect::<Result<_, _>>()?)
        }
        SdkAttributeValue::M(map) => AttributeValue::M(item_from_sdk(map)?),
        other => {
            return Err(StoreError::internal(format!(
                "unsupported attribute value returned by the store: {other:?}"
            )));
        }
    })
}

/// Convert a whole item (or key) into SDK form.
#[must_use]
pub fn item_to_sdk(item: Item) -> SdkItem {
    item.into_iter().map(|(k, v)| (k, to_sdk(v))).collect()
}

/// Convert a whole SDK item (or key) into the model.
pub fn item_from_sdk(item: SdkItem) -> Result<Item, StoreError> {
    item.into_iter()
        .map(|(k, v)| from_sdk(v).map(|v| (k, v)))
        .collect()
}

/// Map an empty collection to `None`; the service rejects empty maps for
/// optional request members.
pub(crate) fn non_empty<T, U>(map: HashMap<T, U>) -> Option<HashMap<T, U>> {
    (!map.is_empty()).then_some(map)
}

pub(crate) fn return_value(value: ReturnValue) -> SdkReturnValue {
    SdkReturnValue::from(value.as_str())
}

pub(crate) fn write_request_to_sdk(request: WriteRequest) -> Result<SdkWriteRequest, StoreError> {
    let mut builder = SdkWriteRequest::builder();
    if let Some(put) = request.put_request {
        let put = SdkPutRequest::builder()
            .set_item(Some(item_to_sdk(put.item)))
            .build()
            .map_err(|e| StoreError::validation(e.to_string()).with_source(e))?;
        builder = builder.put_request(put);
    }
    if let Some(delete) = request.delete_request {
        let delete = SdkDeleteRequest::builder()
            .set_key(Some(item_to_sdk(delete.key)))
            .build()
            .map_err(|e| StoreError::validation(e.to_string()).with_source(e))?;
        builder = builder.delete_request(delete);
    }
    Ok(builder.build())
}

pub(crate) fn write_request_from_sdk(request: SdkWriteRequest) -> Result<WriteRequest, StoreError> {
    if let Some(put) = request.put_request {
        return Ok(WriteRequest::put(item_from_sdk(put.item)?));
    }
    match request.delete_request {
        Some(delete) => Ok(WriteRequest::delete(item_from_sdk(delete.key)?)),
        None => Err(StoreError::internal("write request without a put or delete")),
    }
}
