use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

use crate::error::Result;
use crate::options::RequestOptions;

/// HTTP method of an API call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport used by the index facade.
///
/// `read` may retry transient failures internally; `write` is a single
/// attempt. Both return the decoded JSON response body.
#[async_trait]
pub trait ApiWrapper: Send + Sync {
    async fn read(&self, method: Method, path: &str, options: &RequestOptions) -> Result<Value>;

    async fn write(
        &self,
        method: Method,
        path: &str,
        body: Value,
        options: &RequestOptions,
    ) -> Result<Value>;
}

/// Build an API path, percent-encoding each segment.
///
/// `api_path("/1/indexes/{}/{}", &["my index", "a/b"])` yields
/// `/1/indexes/my%20index/a%2Fb`.
pub fn api_path(template: &str, segments: &[&str]) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut segments = segments.iter();
    let mut rest = template;
    while let Some(pos) = rest.find("{}") {
        out.push_str(&rest[..pos]);
        if let Some(segment) = segments.next() {
            out.push_str(&encode_segment(segment));
        }
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);
    out
}

fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_path_encodes_segments() {
        assert_eq!(
            api_path("/1/indexes/{}/{}", &["my index", "a/b"]),
            "/1/indexes/my%20index/a%2Fb"
        );
        assert_eq!(api_path("/1/indexes/{}/task/{}", &["products", "17"]), "/1/indexes/products/task/17");
        assert_eq!(api_path("/1/indexes/*/objects", &[]), "/1/indexes/*/objects");
    }

    #[test]
    fn test_method_names() {
        assert_eq!(Method::Get.to_string(), "GET");
        assert_eq!(Method::Delete.as_str(), "DELETE");
    }
}
