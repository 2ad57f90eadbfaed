//! An ordered, asynchronous filter chain around the handling of one HTTP exchange.
//!
//! Filters are registered once, ordered once and shared by every request. For each request
//! the [`Server`] picks the filters whose [`FilterScope`] matches, appends the terminal
//! handler and executes the resulting [`FilterChain`]:
//!
//! ```text
//! before(10) -> around-enter(20) -> terminal -> around-exit(20) -> after(10)
//! ```
//!
//! Multipart request bodies are exposed through [`RequestBody::parts`] as a demand-driven
//! stream of completed parts.

mod body;
mod chain;
mod config;
mod error;
mod executor;
mod filter;
mod order;
mod registry;
mod scope;
mod server;

pub use body::{MultipartBody, RequestBody, ResponseBody};
pub use chain::{Continuation, FilterChain};
pub use config::{ExecutorConfig, ServerConfig};
pub use error::{BoxError, ChainBuildError, FilterError};
pub use executor::{Executor, ExecutorPool, Executors};
pub use filter::{
    BeforeInvoker, ContinuationFilter, Filter, FnHandler, FnRequestFilter, FnResponseFilter, HttpFilter, RequestFilter,
    RequestHandler, ResponseFilter, ResponseSource, handler_fn, request_filter_fn, response_filter_fn,
};
pub use order::FilterOrder;
pub use registry::{FilterRegistration, FilterRegistry};
pub use scope::{FilterScope, matcher};
pub use server::{Server, ServerBuilder, init_logging};

/// A request as seen by filters and handlers.
pub type HttpRequest = http::Request<RequestBody>;

/// A response as produced by handlers and adjusted by filters.
pub type HttpResponse = http::Response<ResponseBody>;
