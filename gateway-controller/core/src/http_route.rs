pub use http::{uri::Scheme, Method, StatusCode};
use std::num::NonZeroU16;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpRouteMatch {
    pub path: PathMatch,
    pub headers: Vec<HeaderMatch>,
    pub query_params: Vec<QueryParamMatch>,
    pub method: Option<Method>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathMatch {
    Exact(String),
    Prefix(String),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathType {
    Exact,
    Prefix,
}

/// Header names keep the case they were written with; lookups in the data
/// plane are case-insensitive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderMatch {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryParamMatch {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filters {
    /// Set when a rule carries a filter that can't be honored. Every match of
    /// such a rule answers with an internal error instead of proxying.
    pub invalid: bool,
    pub request_redirect: Option<RequestRedirectFilter>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestRedirectFilter {
    pub scheme: Option<Scheme>,
    pub host: Option<String>,
    pub port: Option<NonZeroU16>,
    pub status: Option<StatusCode>,
}

// === impl HttpRouteMatch ===

impl HttpRouteMatch {
    /// A match that constrains nothing but the path.
    pub fn is_path_only(&self) -> bool {
        self.method.is_none() && self.headers.is_empty() && self.query_params.is_empty()
    }
}

// === impl PathMatch ===

impl Default for PathMatch {
    fn default() -> Self {
        Self::Prefix("/".to_string())
    }
}

impl PathMatch {
    pub fn path(&self) -> &str {
        match self {
            Self::Exact(p) | Self::Prefix(p) => p,
        }
    }

    pub fn path_type(&self) -> PathType {
        match self {
            Self::Exact(_) => PathType::Exact,
            Self::Prefix(_) => PathType::Prefix,
        }
    }
}
