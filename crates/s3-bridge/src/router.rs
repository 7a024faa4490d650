//! Pure request routing.
//!
//! Maps `(method, bucket address, resolved path, query, headers)` to a
//! logical operation. Every unmatched branch resolves to an explicit error,
//! never a silent fallthrough.

use hyper::Method;

use crate::error::S3Result;
use crate::http::{OrderedHeaders, OrderedQs};
use crate::path::BucketAddress;

/// Logical operations the gateway knows how to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    ListBuckets,
    BucketExists { bucket: String },
    AddBucket { bucket: String },
    RemoveBucket { bucket: String },
    ListObjects { bucket: String, prefix: Option<String> },
    ListMultipartUploads { bucket: String },
    GetAcl { bucket: String },
    PutAcl { bucket: String },
    GetObject { bucket: String, key: String },
    AddObject { bucket: String, key: String },
    CreateDirectory { bucket: String, key: String },
    CopyObject { bucket: String, key: String },
    DeleteObject { bucket: String, key: String },
    /// HEAD through the base endpoint, answered with a bare 405.
    HeadAtRoot,
    /// POST is multipart territory, answered with a bare 501.
    NotImplemented,
}

fn object_key(path: &str) -> String {
    path.trim_start_matches('/').to_owned()
}

/// Resolves the operation for a request.
///
/// `resolved_path` is the output of request preprocessing: for base-endpoint
/// requests the bucket segment is already stripped, `/` means "the bucket
/// itself".
///
/// # Errors
/// Returns `InvalidBucketName` when no bucket could be determined and
/// `MethodNotAllowed` for unsupported verbs
pub fn resolve(
    method: &Method,
    addr: &BucketAddress,
    resolved_path: &str,
    qs: &OrderedQs,
    headers: &OrderedHeaders,
) -> S3Result<Route> {
    let bucket = addr.bucket.clone();

    match method.as_str() {
        "HEAD" => {
            if addr.is_base_endpoint {
                return Ok(Route::HeadAtRoot);
            }
            match bucket {
                None => Err(s3_error!(InvalidBucketName, "The specified bucket is not valid")),
                Some(bucket) => Ok(Route::BucketExists { bucket }),
            }
        }
        "GET" => {
            let Some(bucket) = bucket else {
                if addr.is_base_endpoint {
                    return Ok(Route::ListBuckets);
                }
                return Err(s3_error!(InvalidBucketName, "The specified bucket is not valid"));
            };
            if resolved_path == "/" {
                if qs.has("uploads") {
                    return Ok(Route::ListMultipartUploads { bucket });
                }
                return Ok(Route::ListObjects {
                    bucket,
                    prefix: qs.get("prefix").map(str::to_owned),
                });
            }
            if qs.has("acl") {
                return Ok(Route::GetAcl { bucket });
            }
            Ok(Route::GetObject {
                bucket,
                key: object_key(resolved_path),
            })
        }
        "PUT" => {
            let Some(bucket) = bucket else {
                return Err(s3_error!(InvalidBucketName, "The specified bucket is not valid"));
            };
            if resolved_path == "/" {
                return Ok(Route::AddBucket { bucket });
            }
            if qs.has("acl") {
                return Ok(Route::PutAcl { bucket });
            }
            if resolved_path.ends_with('/') {
                return Ok(Route::CreateDirectory {
                    bucket,
                    key: object_key(resolved_path),
                });
            }
            if headers.get("x-amz-metadata-directive") == Some("COPY") {
                return Ok(Route::CopyObject {
                    bucket,
                    key: object_key(resolved_path),
                });
            }
            Ok(Route::AddObject {
                bucket,
                key: object_key(resolved_path),
            })
        }
        "POST" => {
            if bucket.is_none() {
                return Err(s3_error!(InvalidBucketName, "The specified bucket is not valid"));
            }
            Ok(Route::NotImplemented)
        }
        "DELETE" => {
            let Some(bucket) = bucket else {
                return Err(s3_error!(InvalidBucketName, "The specified bucket is not valid"));
            };
            if resolved_path == "/" {
                return Ok(Route::RemoveBucket { bucket });
            }
            Ok(Route::DeleteObject {
                bucket,
                key: object_key(resolved_path),
            })
        }
        _ => Err(s3_error!(MethodNotAllowed, "[{method}] method is not allowed")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_addr(bucket: Option<&str>) -> BucketAddress {
        BucketAddress {
            bucket: bucket.map(str::to_owned),
            is_base_endpoint: true,
        }
    }

    fn subdomain_addr(bucket: Option<&str>) -> BucketAddress {
        BucketAddress {
            bucket: bucket.map(str::to_owned),
            is_base_endpoint: false,
        }
    }

    fn qs(query: &str) -> OrderedQs {
        OrderedQs::parse(query).unwrap()
    }

    fn no_headers() -> OrderedHeaders {
        OrderedHeaders::default()
    }

    #[test]
    fn head_routes() {
        assert_eq!(
            resolve(&Method::HEAD, &base_addr(Some("b")), "/", &OrderedQs::default(), &no_headers()).unwrap(),
            Route::HeadAtRoot
        );
        let err = resolve(&Method::HEAD, &subdomain_addr(None), "/", &OrderedQs::default(), &no_headers()).unwrap_err();
        assert_eq!(err.code(), crate::S3ErrorCode::InvalidBucketName);
        assert_eq!(
            resolve(&Method::HEAD, &subdomain_addr(Some("b")), "/", &OrderedQs::default(), &no_headers()).unwrap(),
            Route::BucketExists { bucket: "b".to_owned() }
        );
    }

    #[test]
    fn get_routes() {
        assert_eq!(
            resolve(&Method::GET, &base_addr(None), "/", &OrderedQs::default(), &no_headers()).unwrap(),
            Route::ListBuckets
        );
        let err = resolve(&Method::GET, &subdomain_addr(None), "/", &OrderedQs::default(), &no_headers()).unwrap_err();
        assert_eq!(err.code(), crate::S3ErrorCode::InvalidBucketName);
        assert_eq!(
            resolve(&Method::GET, &base_addr(Some("b")), "/", &qs("prefix=logs%2F"), &no_headers()).unwrap(),
            Route::ListObjects {
                bucket: "b".to_owned(),
                prefix: Some("logs/".to_owned()),
            }
        );
        assert_eq!(
            resolve(&Method::GET, &base_addr(Some("b")), "/", &qs("uploads"), &no_headers()).unwrap(),
            Route::ListMultipartUploads { bucket: "b".to_owned() }
        );
        assert_eq!(
            resolve(&Method::GET, &base_addr(Some("b")), "key.txt", &qs("acl"), &no_headers()).unwrap(),
            Route::GetAcl { bucket: "b".to_owned() }
        );
        assert_eq!(
            resolve(&Method::GET, &base_addr(Some("b")), "dir/key.txt", &OrderedQs::default(), &no_headers()).unwrap(),
            Route::GetObject {
                bucket: "b".to_owned(),
                key: "dir/key.txt".to_owned(),
            }
        );
    }

    #[test]
    fn put_routes() {
        assert_eq!(
            resolve(&Method::PUT, &base_addr(Some("b")), "/", &OrderedQs::default(), &no_headers()).unwrap(),
            Route::AddBucket { bucket: "b".to_owned() }
        );
        assert_eq!(
            resolve(&Method::PUT, &base_addr(Some("b")), "key", &qs("acl"), &no_headers()).unwrap(),
            Route::PutAcl { bucket: "b".to_owned() }
        );
        assert_eq!(
            resolve(&Method::PUT, &base_addr(Some("b")), "dir/", &OrderedQs::default(), &no_headers()).unwrap(),
            Route::CreateDirectory {
                bucket: "b".to_owned(),
                key: "dir/".to_owned(),
            }
        );
        let copy_headers = OrderedHeaders::from_pairs([
            ("x-amz-metadata-directive".to_owned(), "COPY".to_owned()),
            ("x-amz-copy-source".to_owned(), "/b/src".to_owned()),
        ]);
        assert_eq!(
            resolve(&Method::PUT, &base_addr(Some("b")), "dst", &OrderedQs::default(), &copy_headers).unwrap(),
            Route::CopyObject {
                bucket: "b".to_owned(),
                key: "dst".to_owned(),
            }
        );
        assert_eq!(
            resolve(&Method::PUT, &base_addr(Some("b")), "key", &OrderedQs::default(), &no_headers()).unwrap(),
            Route::AddObject {
                bucket: "b".to_owned(),
                key: "key".to_owned(),
            }
        );
        let err = resolve(&Method::PUT, &base_addr(None), "/", &OrderedQs::default(), &no_headers()).unwrap_err();
        assert_eq!(err.code(), crate::S3ErrorCode::InvalidBucketName);
    }

    #[test]
    fn post_is_not_implemented() {
        assert_eq!(
            resolve(&Method::POST, &base_addr(Some("b")), "key", &OrderedQs::default(), &no_headers()).unwrap(),
            Route::NotImplemented
        );
        let err = resolve(&Method::POST, &base_addr(None), "/", &OrderedQs::default(), &no_headers()).unwrap_err();
        assert_eq!(err.code(), crate::S3ErrorCode::InvalidBucketName);
    }

    #[test]
    fn delete_routes() {
        assert_eq!(
            resolve(&Method::DELETE, &base_addr(Some("b")), "/", &OrderedQs::default(), &no_headers()).unwrap(),
            Route::RemoveBucket { bucket: "b".to_owned() }
        );
        assert_eq!(
            resolve(&Method::DELETE, &base_addr(Some("b")), "key", &OrderedQs::default(), &no_headers()).unwrap(),
            Route::DeleteObject {
                bucket: "b".to_owned(),
                key: "key".to_owned(),
            }
        );
        let err = resolve(&Method::DELETE, &subdomain_addr(None), "/", &OrderedQs::default(), &no_headers()).unwrap_err();
        assert_eq!(err.code(), crate::S3ErrorCode::InvalidBucketName);
    }

    #[test]
    fn other_methods_are_rejected() {
        let err = resolve(&Method::PATCH, &base_addr(Some("b")), "/", &OrderedQs::default(), &no_headers()).unwrap_err();
        assert_eq!(err.code(), crate::S3ErrorCode::MethodNotAllowed);
    }
}
