use bytes::Bytes;
use http::Method;

#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    request: TestRequest,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, request: TestRequest) -> Self {
        Self { name, group, request }
    }

    pub fn first(name: &'static str, request: TestRequest) -> Self {
        Self::new(name, TestGroup::First, request)
    }

    pub fn last(name: &'static str, request: TestRequest) -> Self {
        Self::new(name, TestGroup::Last, request)
    }

    pub fn miss(name: &'static str, request: TestRequest) -> Self {
        Self::new(name, TestGroup::Miss, request)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn request(&self) -> &TestRequest {
        &self.request
    }
}

/// A request to replay: method, target and an optional JSON body.
#[derive(Debug, Copy, Clone)]
pub struct TestRequest {
    method: &'static str,
    target: &'static str,
    body: &'static str,
}

impl TestRequest {
    pub const fn new(method: &'static str, target: &'static str, body: &'static str) -> Self {
        Self { method, target, body }
    }

    pub const fn get(target: &'static str) -> Self {
        Self::new("GET", target, "")
    }

    pub fn target(&self) -> &'static str {
        self.target
    }

    /// The path part of the target.
    pub fn path(&self) -> &'static str {
        self.target.split_once('?').map_or(self.target, |(path, _)| path)
    }

    /// Builds a fresh request; the method and target are constants known to be valid.
    pub fn to_http(&self) -> http::Request<Bytes> {
        let mut request = http::Request::new(Bytes::from_static(self.body.as_bytes()));
        *request.method_mut() = Method::from_bytes(self.method.as_bytes()).unwrap_or_default();
        *request.uri_mut() = self.target.parse().unwrap_or_default();
        request
    }
}

/// Where in the route table the request is expected to land.
#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    First,
    Last,
    Miss,
}
