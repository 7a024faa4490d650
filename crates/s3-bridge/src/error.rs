//! S3 error taxonomy and XML error bodies.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

use hyper::StatusCode;
use serde::Serialize;

/// Generates [`S3Error`] with code and optional message.
macro_rules! s3_error {
    ($code:ident) => {
        $crate::S3Error::new($crate::S3ErrorCode::$code)
    };
    ($code:ident, $($arg:tt)+) => {
        $crate::S3Error::with_message($crate::S3ErrorCode::$code, format!($($arg)+))
    };
    ($source:expr, $code:ident, $($arg:tt)+) => {{
        let mut err = s3_error!($code, $($arg)+);
        err.set_source(Box::new($source));
        err
    }};
}

/// Machine-readable error codes surfaced in XML `<Error><Code>` bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum S3ErrorCode {
    AccessDenied,
    BucketAlreadyExists,
    BucketNotEmpty,
    InternalError,
    InvalidArgument,
    InvalidBucketName,
    MethodNotAllowed,
    NoSuchBucket,
    NotFound,
    NotImplemented,
    RequestTimeTooSkewed,
    SignatureDoesNotMatch,
}

impl S3ErrorCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AccessDenied => "AccessDenied",
            Self::BucketAlreadyExists => "BucketAlreadyExists",
            Self::BucketNotEmpty => "BucketNotEmpty",
            Self::InternalError => "InternalError",
            Self::InvalidArgument => "InvalidArgument",
            Self::InvalidBucketName => "InvalidBucketName",
            Self::MethodNotAllowed => "MethodNotAllowed",
            Self::NoSuchBucket => "NoSuchBucket",
            Self::NotFound => "NotFound",
            Self::NotImplemented => "NotImplemented",
            Self::RequestTimeTooSkewed => "RequestTimeTooSkewed",
            Self::SignatureDoesNotMatch => "SignatureDoesNotMatch",
        }
    }

    #[must_use]
    pub fn status_code(self) -> StatusCode {
        match self {
            Self::AccessDenied | Self::RequestTimeTooSkewed | Self::SignatureDoesNotMatch => StatusCode::FORBIDDEN,
            Self::BucketAlreadyExists | Self::BucketNotEmpty => StatusCode::CONFLICT,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidArgument | Self::InvalidBucketName => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::NoSuchBucket | Self::NotFound => StatusCode::NOT_FOUND,
            Self::NotImplemented => StatusCode::NOT_IMPLEMENTED,
        }
    }
}

impl fmt::Display for S3ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extra diagnostic fields carried by `SignatureDoesNotMatch` responses.
#[derive(Debug, Clone)]
pub struct SignatureMismatch {
    pub access_key_id: String,
    pub string_to_sign: String,
    pub signature_provided: String,
}

/// Extra diagnostic fields carried by `RequestTimeTooSkewed` responses.
#[derive(Debug, Clone)]
pub struct ClockSkew {
    pub request_time: String,
    pub server_time: String,
    pub max_allowed_skew_ms: i64,
}

pub struct S3Error {
    code: S3ErrorCode,
    message: Option<Cow<'static, str>>,
    argument: Option<(String, String)>,
    signature: Option<SignatureMismatch>,
    skew: Option<ClockSkew>,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

pub type S3Result<T = (), E = S3Error> = Result<T, E>;

impl S3Error {
    #[must_use]
    pub fn new(code: S3ErrorCode) -> Self {
        Self {
            code,
            message: None,
            argument: None,
            signature: None,
            skew: None,
            source: None,
        }
    }

    #[must_use]
    pub fn with_message(code: S3ErrorCode, message: impl Into<Cow<'static, str>>) -> Self {
        let mut err = Self::new(code);
        err.message = Some(message.into());
        err
    }

    /// Wraps an unexpected collaborator failure as `InternalError`.
    #[must_use]
    pub fn internal_error<E>(source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let mut err = Self::with_message(S3ErrorCode::InternalError, "We encountered an internal error. Please try again.");
        err.set_source(Box::new(source));
        err
    }

    /// `InvalidArgument` annotated with the offending argument name and value.
    #[must_use]
    pub fn invalid_argument(name: impl Into<String>, value: impl Into<String>, message: impl Into<Cow<'static, str>>) -> Self {
        let mut err = Self::with_message(S3ErrorCode::InvalidArgument, message);
        err.argument = Some((name.into(), value.into()));
        err
    }

    #[must_use]
    pub fn signature_does_not_match(mismatch: SignatureMismatch) -> Self {
        let mut err = Self::with_message(
            S3ErrorCode::SignatureDoesNotMatch,
            "The request signature we calculated does not match the signature you provided.",
        );
        err.signature = Some(mismatch);
        err
    }

    #[must_use]
    pub fn request_time_too_skewed(skew: ClockSkew) -> Self {
        let mut err = Self::with_message(
            S3ErrorCode::RequestTimeTooSkewed,
            "The difference between the request time and the current time is too large.",
        );
        err.skew = Some(skew);
        err
    }

    #[must_use]
    pub fn code(&self) -> S3ErrorCode {
        self.code
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    pub fn set_source(&mut self, source: Box<dyn StdError + Send + Sync + 'static>) {
        self.source = Some(source);
    }

    /// Serializes the `<Error>` body.
    pub fn to_xml(&self) -> Result<String, quick_xml::SeError> {
        let (argument_name, argument_value) = match &self.argument {
            Some((name, value)) => (Some(name.as_str()), Some(value.as_str())),
            None => (None, None),
        };
        let body = ErrorXml {
            code: self.code.as_str(),
            message: self.message.as_deref(),
            argument_name,
            argument_value,
            access_key_id: self.signature.as_ref().map(|s| s.access_key_id.as_str()),
            string_to_sign: self.signature.as_ref().map(|s| s.string_to_sign.as_str()),
            signature_provided: self.signature.as_ref().map(|s| s.signature_provided.as_str()),
            request_time: self.skew.as_ref().map(|s| s.request_time.as_str()),
            server_time: self.skew.as_ref().map(|s| s.server_time.as_str()),
            max_allowed_skew_milliseconds: self.skew.as_ref().map(|s| s.max_allowed_skew_ms),
        };
        crate::xml::serialize(&body)
    }
}

impl fmt::Debug for S3Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("S3Error");
        d.field("code", &self.code);
        if let Some(message) = &self.message {
            d.field("message", message);
        }
        if let Some(argument) = &self.argument {
            d.field("argument", argument);
        }
        if let Some(source) = &self.source {
            d.field("source", source);
        }
        d.finish_non_exhaustive()
    }
}

impl fmt::Display for S3Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {message}", self.code),
            None => fmt::Display::fmt(&self.code, f),
        }
    }
}

impl StdError for S3Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.source {
            Some(err) => Some(&**err),
            None => None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename = "Error")]
struct ErrorXml<'a> {
    #[serde(rename = "Code")]
    code: &'a str,
    #[serde(rename = "Message", skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(rename = "ArgumentName", skip_serializing_if = "Option::is_none")]
    argument_name: Option<&'a str>,
    #[serde(rename = "ArgumentValue", skip_serializing_if = "Option::is_none")]
    argument_value: Option<&'a str>,
    #[serde(rename = "AWSAccessKeyId", skip_serializing_if = "Option::is_none")]
    access_key_id: Option<&'a str>,
    #[serde(rename = "StringToSign", skip_serializing_if = "Option::is_none")]
    string_to_sign: Option<&'a str>,
    #[serde(rename = "SignatureProvided", skip_serializing_if = "Option::is_none")]
    signature_provided: Option<&'a str>,
    #[serde(rename = "RequestTime", skip_serializing_if = "Option::is_none")]
    request_time: Option<&'a str>,
    #[serde(rename = "ServerTime", skip_serializing_if = "Option::is_none")]
    server_time: Option<&'a str>,
    #[serde(rename = "MaxAllowedSkewMilliseconds", skip_serializing_if = "Option::is_none")]
    max_allowed_skew_milliseconds: Option<i64>,
}
