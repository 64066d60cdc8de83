//! Outbound HTTP port used by the webhook dispatcher.

use std::future::Future;

use hookflow_domain::dispatch::{DispatchError, DispatchRequest, DispatchResponse};

/// Sends one HTTP request.
///
/// Implementations return any response they receive, whatever its status;
/// classifying non-2xx statuses and enforcing the per-attempt timeout is the
/// dispatcher's job. Connection-level failures map to
/// [`DispatchError::Network`] (or [`DispatchError::Timeout`] when the client
/// itself gave up).
pub trait HttpClient {
    fn send(
        &self,
        request: DispatchRequest,
    ) -> impl Future<Output = Result<DispatchResponse, DispatchError>> + Send;
}

impl<T: HttpClient + Send + Sync> HttpClient for std::sync::Arc<T> {
    fn send(
        &self,
        request: DispatchRequest,
    ) -> impl Future<Output = Result<DispatchResponse, DispatchError>> + Send {
        (**self).send(request)
    }
}
