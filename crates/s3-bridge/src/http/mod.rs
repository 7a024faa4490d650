//! HTTP request/response types shared by the gateway pipeline.

mod ordered_headers;
pub use self::ordered_headers::OrderedHeaders;

mod ordered_qs;
pub use self::ordered_qs::OrderedQs;

use std::fmt;

use bytes::Bytes;
use futures::StreamExt;
use futures::TryStreamExt;
use futures::stream::BoxStream;
use http_body_util::BodyExt;
use http_body_util::BodyStream;
use http_body_util::StreamBody;
use http_body_util::combinators::UnsyncBoxBody;
use hyper::body::Frame;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Method, StatusCode};
use serde::Serialize;

use crate::error::{S3Error, S3Result};

/// Boxed response body handed to hyper.
pub type DynBody = UnsyncBoxBody<Bytes, std::io::Error>;

/// Request/response payload. Either buffered bytes or a byte stream.
#[derive(Default)]
pub enum Body {
    #[default]
    Empty,
    Bytes(Bytes),
    Stream(BoxStream<'static, std::io::Result<Bytes>>),
}

impl Body {
    /// Buffers the whole payload in memory.
    ///
    /// # Errors
    /// Returns an error if the underlying stream fails
    pub async fn store_all(self) -> std::io::Result<Bytes> {
        match self {
            Self::Empty => Ok(Bytes::new()),
            Self::Bytes(bytes) => Ok(bytes),
            Self::Stream(mut stream) => {
                let mut buf = Vec::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(Bytes::from(buf))
            }
        }
    }

    #[must_use]
    pub fn into_http_body(self) -> DynBody {
        match self {
            Self::Empty => http_body_util::Empty::new().map_err(std::io::Error::other).boxed_unsync(),
            Self::Bytes(bytes) => http_body_util::Full::new(bytes).map_err(std::io::Error::other).boxed_unsync(),
            Self::Stream(stream) => BodyExt::boxed_unsync(StreamBody::new(stream.map_ok(Frame::data))),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Self::Bytes(Bytes::from(s))
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Body::Empty"),
            Self::Bytes(bytes) => f.debug_tuple("Body::Bytes").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Body::Stream"),
        }
    }
}

/// A decoded incoming request.
#[derive(Debug)]
pub struct S3Request {
    pub method: Method,
    /// Percent-decoded uri path.
    pub uri_path: String,
    pub qs: OrderedQs,
    pub headers: OrderedHeaders,
    pub host: Option<String>,
    pub body: Body,
}

impl S3Request {
    /// Converts a generic http request into an [`S3Request`].
    ///
    /// # Errors
    /// Returns `InvalidArgument` for undecodable paths, query strings or
    /// header values
    pub fn from_http<B>(req: http::Request<B>) -> S3Result<Self>
    where
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: std::error::Error + Send + Sync + 'static,
    {
        let (parts, body) = req.into_parts();

        let raw_path = parts.uri.path();
        let uri_path = urlencoding::decode(raw_path)
            .map_err(|_| S3Error::invalid_argument("path", raw_path, "Invalid percent-encoding in request path"))?
            .into_owned();

        let qs = match parts.uri.query() {
            Some(query) => {
                OrderedQs::parse(query).map_err(|_| S3Error::invalid_argument("query", query, "Invalid query string"))?
            }
            None => OrderedQs::default(),
        };

        let headers = OrderedHeaders::from_headers(&parts.headers)
            .map_err(|_| s3_error!(InvalidArgument, "Invalid header value"))?;
        let host = headers.get("host").map(str::to_owned);

        let stream = BodyStream::new(body).filter_map(|frame| async move {
            match frame {
                Ok(frame) => frame.into_data().ok().map(Ok),
                Err(e) => Some(Err(std::io::Error::other(e))),
            }
        });

        Ok(Self {
            method: parts.method,
            uri_path,
            qs,
            headers,
            host,
            body: Body::Stream(Box::pin(stream)),
        })
    }
}

/// An outgoing response before hyper conversion.
#[derive(Debug)]
pub struct S3Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

impl S3Response {
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Body::Empty,
        }
    }

    #[must_use]
    pub fn with_body(status: StatusCode, body: Body) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    /// Sets a header from a string value.
    ///
    /// # Errors
    /// Returns `InternalError` if the value is not a legal header value
    pub fn set_header(&mut self, name: HeaderName, value: &str) -> S3Result<()> {
        let value = HeaderValue::from_str(value).map_err(S3Error::internal_error)?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Serializes `value` as the XML response body.
    ///
    /// # Errors
    /// Returns `InternalError` if serialization fails
    pub fn set_xml_body<T: Serialize>(&mut self, value: &T) -> S3Result<()> {
        let xml = crate::xml::serialize(value).map_err(S3Error::internal_error)?;
        self.headers
            .insert(hyper::header::CONTENT_TYPE, HeaderValue::from_static("application/xml"));
        self.body = Body::from(xml);
        Ok(())
    }
}

impl From<S3Response> for hyper::Response<DynBody> {
    fn from(resp: S3Response) -> Self {
        let mut http_resp = hyper::Response::new(resp.body.into_http_body());
        *http_resp.status_mut() = resp.status;
        *http_resp.headers_mut() = resp.headers;
        http_resp
    }
}
