//! Handler port: per-address consumers of routed device messages.

use std::future::Future;
use std::pin::Pin;

use filmscreen_domain::error::FilmscreenError;
use filmscreen_domain::protocol::Message;

/// Boxed future returned by [`MessageHandler::handle`].
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<(), FilmscreenError>> + Send + 'a>>;

/// Something that consumes the messages addressed to one motor.
///
/// Handlers are stored as `Arc<dyn MessageHandler>` in the dispatch table,
/// hence the boxed future instead of an `impl Future` return.
pub trait MessageHandler: Send + Sync {
    fn handle<'a>(&'a self, message: &'a Message) -> HandlerFuture<'a>;
}
