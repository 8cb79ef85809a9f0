//! Middleware chain composition.
//!
//! A [`Handler`] is the ordered middleware list for one dispatch. Calling
//! [`Handler::dispatch`] hands the request to the first middleware with a [`Next`] cursor over
//! the rest; the last [`Next::run`] reaches the [`RequestExecutor`]. The first registered
//! middleware therefore sees the request first and the response last.

// self
use crate::{
	_prelude::*,
	http::{PendingRequest, RequestExecutor, ResponseFuture},
};

/// Request-transforming layer composed into a [`Handler`].
pub trait Middleware
where
	Self: 'static + Send + Sync,
{
	/// Processes `request`, usually by forwarding it (possibly modified) to `next`.
	fn handle<'a>(&'a self, request: PendingRequest, next: Next<'a>) -> ResponseFuture<'a>;
}

/// Cursor over the remaining middlewares of a [`Handler`].
#[derive(Clone, Copy)]
pub struct Next<'a> {
	chain: &'a [Arc<dyn Middleware>],
	executor: &'a dyn RequestExecutor,
}
impl<'a> Next<'a> {
	/// Forwards `request` to the next middleware, or to the executor at the end of the chain.
	pub fn run(self, request: PendingRequest) -> ResponseFuture<'a> {
		match self.chain.split_first() {
			Some((head, rest)) => head.handle(request, Next { chain: rest, executor: self.executor }),
			None => self.executor.execute(request),
		}
	}
}
impl Debug for Next<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Next").field("remaining", &self.chain.len()).finish()
	}
}

/// Execution handler built from a middleware chain.
#[derive(Clone, Default)]
pub struct Handler(Vec<Arc<dyn Middleware>>);
impl Handler {
	/// Builds a handler applying `chain` in order.
	pub fn new(chain: Vec<Arc<dyn Middleware>>) -> Self {
		Self(chain)
	}

	/// Appends a middleware after the existing ones.
	pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
		self.0.push(middleware);
	}

	/// Returns the number of middlewares in the chain.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` when the handler forwards straight to the executor.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Runs `request` through the chain and finally through `executor`.
	pub fn dispatch<'a>(
		&'a self,
		request: PendingRequest,
		executor: &'a dyn RequestExecutor,
	) -> ResponseFuture<'a> {
		Next { chain: &self.0, executor }.run(request)
	}
}
impl Debug for Handler {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Handler").field(&self.0.len()).finish()
	}
}

/// Adapts a plain request-transforming function into a [`Middleware`].
pub struct MapRequest<F>(F);
impl<F> MapRequest<F>
where
	F: 'static + Send + Sync + Fn(PendingRequest) -> Result<PendingRequest>,
{
	/// Wraps `f`.
	pub fn new(f: F) -> Self {
		Self(f)
	}
}
impl<F> Middleware for MapRequest<F>
where
	F: 'static + Send + Sync + Fn(PendingRequest) -> Result<PendingRequest>,
{
	fn handle<'a>(&'a self, request: PendingRequest, next: Next<'a>) -> ResponseFuture<'a> {
		match (self.0)(request) {
			Ok(request) => next.run(request),
			Err(e) => Box::pin(std::future::ready(Err(e))),
		}
	}
}
impl<F> Debug for MapRequest<F> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("MapRequest(..)")
	}
}
