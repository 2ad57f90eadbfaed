use super::{RequestFilter, RequestHandler, ResponseFilter};
use crate::error::BoxError;
use crate::{HttpRequest, HttpResponse};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;

/// A [`RequestFilter`] backed by a closure.
pub struct FnRequestFilter<F> {
    f: F,
}

/// A [`ResponseFilter`] backed by a closure.
pub struct FnResponseFilter<F> {
    f: F,
}

/// A [`RequestHandler`] backed by an async closure.
///
/// The returned future can't borrow the request; copy what it needs out first.
pub struct FnHandler<F> {
    f: F,
}

pub fn request_filter_fn<F>(f: F) -> FnRequestFilter<F>
where
    F: Fn(&mut HttpRequest) -> Result<Option<HttpResponse>, BoxError> + Send + Sync,
{
    FnRequestFilter { f }
}

pub fn response_filter_fn<F>(f: F) -> FnResponseFilter<F>
where
    F: Fn(&HttpRequest, &mut HttpResponse) -> Result<(), BoxError> + Send + Sync,
{
    FnResponseFilter { f }
}

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(&HttpRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HttpResponse, BoxError>> + Send + 'static,
{
    FnHandler { f }
}

#[async_trait]
impl<F> RequestFilter for FnRequestFilter<F>
where
    F: Fn(&mut HttpRequest) -> Result<Option<HttpResponse>, BoxError> + Send + Sync,
{
    async fn filter_request(&self, req: &mut HttpRequest) -> Result<Option<HttpResponse>, BoxError> {
        (self.f)(req)
    }
}

#[async_trait]
impl<F> ResponseFilter for FnResponseFilter<F>
where
    F: Fn(&HttpRequest, &mut HttpResponse) -> Result<(), BoxError> + Send + Sync,
{
    async fn filter_response(&self, req: &HttpRequest, resp: &mut HttpResponse) -> Result<(), BoxError> {
        (self.f)(req, resp)
    }
}

#[async_trait]
impl<F, Fut> RequestHandler for FnHandler<F>
where
    F: Fn(&HttpRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HttpResponse, BoxError>> + Send + 'static,
{
    async fn invoke(&self, req: &HttpRequest) -> Result<HttpResponse, BoxError> {
        (self.f)(req).await
    }
}

impl<F> fmt::Debug for FnRequestFilter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnRequestFilter")
    }
}

impl<F> fmt::Debug for FnResponseFilter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnResponseFilter")
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnHandler")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{RequestBody, ResponseBody};
    use http::{Request, Response, StatusCode};
    use http_body::Body as HttpBody;

    #[tokio::test]
    async fn closures_act_as_filters() {
        let before = request_filter_fn(|req: &mut HttpRequest| {
            req.headers_mut().insert("x-seen", "1".parse()?);
            Ok(None)
        });
        let after = response_filter_fn(|_req: &HttpRequest, resp: &mut HttpResponse| {
            *resp.status_mut() = StatusCode::ACCEPTED;
            Ok(())
        });
        let handler = handler_fn(|req: &HttpRequest| {
            let seen = req.headers().contains_key("x-seen");
            async move { Ok(Response::new(ResponseBody::from(if seen { "seen" } else { "unseen" }))) }
        });

        let mut req = Request::new(RequestBody::empty());
        assert!(before.filter_request(&mut req).await.unwrap().is_none());

        let mut resp = handler.invoke(&req).await.unwrap();
        after.filter_response(&req, &mut resp).await.unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert_eq!(resp.body().size_hint().exact(), Some(4));
    }
}
