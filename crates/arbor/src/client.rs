//! The seam to the external question-answering service.

use crate::wire::{ExpansionError, ExpansionRequest, RawReply};
use std::future::Future;
use std::rc::Rc;
use std::sync::Arc;

/// Asks the expansion service about one node.
///
/// Implementations perform the transport only. A failed round trip is an
/// [`ExpansionError::Transport`]; any reply that arrives, including error statuses, is returned
/// as a [`RawReply`] and decoded by the explorer.
pub trait ExpansionClient {
    fn expand(
        &self,
        request: ExpansionRequest,
    ) -> impl Future<Output = Result<RawReply, ExpansionError>>;
}

impl<C: ExpansionClient> ExpansionClient for &C {
    fn expand(
        &self,
        request: ExpansionRequest,
    ) -> impl Future<Output = Result<RawReply, ExpansionError>> {
        (**self).expand(request)
    }
}

impl<C: ExpansionClient> ExpansionClient for Rc<C> {
    fn expand(
        &self,
        request: ExpansionRequest,
    ) -> impl Future<Output = Result<RawReply, ExpansionError>> {
        (**self).expand(request)
    }
}

impl<C: ExpansionClient> ExpansionClient for Arc<C> {
    fn expand(
        &self,
        request: ExpansionRequest,
    ) -> impl Future<Output = Result<RawReply, ExpansionError>> {
        (**self).expand(request)
    }
}

/// Adapts a closure returning a future into an [`ExpansionClient`].
#[derive(Debug, Clone)]
pub struct FnClient<F>(F);

pub fn from_fn<F, Fut>(f: F) -> FnClient<F>
where
    F: Fn(ExpansionRequest) -> Fut,
    Fut: Future<Output = Result<RawReply, ExpansionError>>,
{
    FnClient(f)
}

impl<F, Fut> ExpansionClient for FnClient<F>
where
    F: Fn(ExpansionRequest) -> Fut,
    Fut: Future<Output = Result<RawReply, ExpansionError>>,
{
    fn expand(
        &self,
        request: ExpansionRequest,
    ) -> impl Future<Output = Result<RawReply, ExpansionError>> {
        (self.0)(request)
    }
}
