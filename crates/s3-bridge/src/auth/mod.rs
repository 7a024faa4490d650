//! Authentication dispatcher.
//!
//! Inspects the `Authorization` header prefix and routes the request to the
//! matching signature verifier. The v4 prefix is checked first since it
//! starts with the v2 prefix.

mod secret_key;
pub use self::secret_key::SecretKey;

use hyper::Method;
use time::OffsetDateTime;

use crate::config::BridgeConfig;
use crate::error::{ClockSkew, S3Error, S3Result};
use crate::http::{OrderedHeaders, S3Request};
use crate::{sig_v2, sig_v4};

/// Terminal outcome of the authentication state machine.
#[derive(Debug)]
pub enum AuthDecision {
    Authorized,
    Rejected(S3Error),
}

impl AuthDecision {
    #[must_use]
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized)
    }

    /// # Errors
    /// Returns the rejection error
    pub fn into_result(self) -> S3Result<()> {
        match self {
            Self::Authorized => Ok(()),
            Self::Rejected(err) => Err(err),
        }
    }
}

/// Extracts the request timestamp header, `Date` first then `x-amz-date`.
///
/// # Errors
/// Returns `AccessDenied` when neither header is present
pub(crate) fn request_date_value(headers: &OrderedHeaders) -> S3Result<&str> {
    headers
        .get("date")
        .or_else(|| headers.get("x-amz-date"))
        .ok_or_else(|| s3_error!(AccessDenied, "AWS authentication requires a valid Date or x-amz-date header"))
}

/// Rejects requests whose timestamp differs from `now` by more than
/// `max_skew_ms` in either direction.
///
/// # Errors
/// Returns `InvalidArgument` for unparseable timestamps and
/// `RequestTimeTooSkewed` past the boundary
pub(crate) fn check_clock_skew(date_value: &str, now: OffsetDateTime, max_skew_ms: i64) -> S3Result<()> {
    let Some(request_time) = crate::time::parse_request_date(date_value) else {
        return Err(S3Error::invalid_argument("Date", date_value, "Invalid Date header"));
    };
    let skew_ms = (now - request_time).whole_milliseconds().unsigned_abs();
    if skew_ms > u128::from(max_skew_ms.unsigned_abs()) {
        return Err(S3Error::request_time_too_skewed(ClockSkew {
            request_time: crate::time::fmt_rfc3339(request_time),
            server_time: crate::time::fmt_rfc3339(now),
            max_allowed_skew_ms: max_skew_ms,
        }));
    }
    Ok(())
}

/// Runs the authentication state machine for one request.
///
/// `HEAD /` always passes without credentials (health-check bypass).
#[must_use]
pub fn authenticate(req: &S3Request, config: &BridgeConfig, now: OffsetDateTime) -> AuthDecision {
    if req.method == Method::HEAD && req.uri_path == "/" {
        return AuthDecision::Authorized;
    }

    let Some(authorization) = req.headers.get("authorization") else {
        return AuthDecision::Rejected(s3_error!(AccessDenied, "Anonymous access is forbidden for this operation"));
    };

    let outcome = if authorization.starts_with(sig_v4::SIGNATURE_PREFIX) {
        sig_v4::authenticate(req, config, now)
    } else if authorization.starts_with(sig_v2::SIGNATURE_PREFIX) {
        sig_v2::authenticate(req, config, now)
    } else {
        Err(S3Error::invalid_argument(
            "Authorization",
            authorization,
            "Unsupported Authorization Type",
        ))
    };

    match outcome {
        Ok(()) => AuthDecision::Authorized,
        Err(err) => AuthDecision::Rejected(err),
    }
}
