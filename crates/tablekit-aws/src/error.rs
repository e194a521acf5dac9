//! Mapping SDK failures onto [`StoreError`].

use std::fmt::Debug;

use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use tablekit_model::{StoreError, StoreErrorCode};

/// Translate an SDK failure into a [`StoreError`].
///
/// Service exceptions keep their code; throttling is folded into
/// [`StoreErrorCode::ProvisionedThroughputExceeded`]. Failures without a
/// service response (timeouts, dispatch, construction) become
/// [`StoreErrorCode::Internal`] with the SDK error attached as the source.
pub fn map_sdk_error<E, R>(err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: Debug + Send + Sync + 'static,
{
    let code = err.code().map_or(StoreErrorCode::Internal, code_for);
    let message = err
        .message()
        .map_or_else(|| DisplayErrorContext(&err).to_string(), str::to_owned);
    StoreError::with_message(code, message).with_source(err)
}

fn code_for(name: &str) -> StoreErrorCode {
    match name {
        "ThrottlingException" => StoreErrorCode::ProvisionedThroughputExceeded,
        other => StoreErrorCode::from_name(other).unwrap_or(StoreErrorCode::Internal),
    }
}
