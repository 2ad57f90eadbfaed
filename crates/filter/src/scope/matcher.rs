use crate::HttpRequest;
use http::{HeaderName, HeaderValue, Method};
use std::fmt;

/// A predicate deciding whether a filter applies to a request.
pub trait RequestMatcher: Send + Sync {
    fn matches(&self, req: &HttpRequest) -> bool;
}

struct FnMatcher<F: Fn(&HttpRequest) -> bool>(F);

impl<F: Fn(&HttpRequest) -> bool + Send + Sync> RequestMatcher for FnMatcher<F> {
    fn matches(&self, req: &HttpRequest) -> bool {
        (self.0)(req)
    }
}

pub fn fn_matcher<F>(f: F) -> impl RequestMatcher
where
    F: Fn(&HttpRequest) -> bool + Send + Sync,
{
    FnMatcher(f)
}

pub fn always() -> TrueMatcher {
    TrueMatcher
}

#[derive(Debug, Clone, Copy)]
pub struct TrueMatcher;

impl RequestMatcher for TrueMatcher {
    #[inline]
    fn matches(&self, _req: &HttpRequest) -> bool {
        true
    }
}

pub fn any_matcher() -> AnyMatcher {
    AnyMatcher::new()
}

/// compose matchers with *OR* logic, an empty [`AnyMatcher`] matches every request
pub struct AnyMatcher {
    matchers: Vec<Box<dyn RequestMatcher>>,
}

impl AnyMatcher {
    fn new() -> Self {
        Self { matchers: vec![] }
    }

    pub fn or<M: RequestMatcher + 'static>(mut self, matcher: M) -> Self {
        self.matchers.push(Box::new(matcher));
        self
    }
}

impl RequestMatcher for AnyMatcher {
    fn matches(&self, req: &HttpRequest) -> bool {
        self.matchers.is_empty() || self.matchers.iter().any(|matcher| matcher.matches(req))
    }
}

pub fn all_matcher() -> AllMatcher {
    AllMatcher::new()
}

/// compose matchers with *AND* logic
pub struct AllMatcher {
    matchers: Vec<Box<dyn RequestMatcher>>,
}

impl AllMatcher {
    fn new() -> Self {
        Self { matchers: vec![] }
    }

    pub fn and<M: RequestMatcher + 'static>(mut self, matcher: M) -> Self {
        self.matchers.push(Box::new(matcher));
        self
    }
}

impl RequestMatcher for AllMatcher {
    fn matches(&self, req: &HttpRequest) -> bool {
        self.matchers.iter().all(|matcher| matcher.matches(req))
    }
}

impl fmt::Debug for AnyMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyMatcher").field("len", &self.matchers.len()).finish()
    }
}

impl fmt::Debug for AllMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllMatcher").field("len", &self.matchers.len()).finish()
    }
}

#[derive(Debug, Clone)]
pub struct MethodMatcher(Method);

impl RequestMatcher for MethodMatcher {
    fn matches(&self, req: &HttpRequest) -> bool {
        self.0.eq(req.method())
    }
}

macro_rules! method_matcher {
    ($method:ident, $upper_case_method:ident) => {
        #[inline]
        pub fn $method() -> MethodMatcher {
            MethodMatcher(Method::$upper_case_method)
        }
    };
}

method_matcher!(get_method, GET);
method_matcher!(post_method, POST);
method_matcher!(put_method, PUT);
method_matcher!(delete_method, DELETE);
method_matcher!(head_method, HEAD);
method_matcher!(options_method, OPTIONS);
method_matcher!(patch_method, PATCH);

/// Matches requests carrying `header_name: header_value`.
pub fn header<K, V>(header_name: K, header_value: V) -> Result<HeaderMatcher, http::Error>
where
    HeaderName: TryFrom<K>,
    <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
    HeaderValue: TryFrom<V>,
    <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
{
    let name = <HeaderName as TryFrom<K>>::try_from(header_name).map_err(Into::<http::Error>::into)?;
    let value = <HeaderValue as TryFrom<V>>::try_from(header_value).map_err(Into::<http::Error>::into)?;
    Ok(HeaderMatcher(name, value))
}

#[derive(Debug, Clone)]
pub struct HeaderMatcher(HeaderName, HeaderValue);

impl RequestMatcher for HeaderMatcher {
    fn matches(&self, req: &HttpRequest) -> bool {
        req.headers().get(&self.0).is_some_and(|value| self.1.eq(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::RequestBody;
    use http::Request;

    fn request(method: Method, content_type: Option<&'static str>) -> HttpRequest {
        let mut builder = Request::builder().method(method).uri("/");
        if let Some(content_type) = content_type {
            builder = builder.header(http::header::CONTENT_TYPE, content_type);
        }
        builder.body(RequestBody::empty()).unwrap()
    }

    #[test]
    fn method_and_header_compose() {
        let json_post = all_matcher().and(post_method()).and(header(http::header::CONTENT_TYPE, "application/json").unwrap());

        assert!(json_post.matches(&request(Method::POST, Some("application/json"))));
        assert!(!json_post.matches(&request(Method::POST, Some("text/plain"))));
        assert!(!json_post.matches(&request(Method::GET, Some("application/json"))));
    }

    #[test]
    fn any_matcher_needs_one_success() {
        let reads = any_matcher().or(get_method()).or(head_method());

        assert!(reads.matches(&request(Method::HEAD, None)));
        assert!(!reads.matches(&request(Method::DELETE, None)));
        assert!(any_matcher().matches(&request(Method::DELETE, None)));
    }

    #[test]
    fn invalid_header_is_an_error() {
        assert!(matches!(header("bad header", "x"), Err(_)));
        assert!(fn_matcher(|req: &HttpRequest| req.uri().path() == "/").matches(&request(Method::GET, None)));
        assert!(always().matches(&request(Method::GET, None)));
    }
}
