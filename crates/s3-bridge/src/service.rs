//! Per-request pipeline: authentication, path resolution, routing and
//! dispatch to operation handlers.

use std::sync::Arc;

use hyper::header::{CONTENT_TYPE, HeaderValue, SERVER};
use hyper::{Method, StatusCode};
use time::OffsetDateTime;

use crate::config::BridgeConfig;
use crate::error::{S3Error, S3ErrorCode, S3Result};
use crate::http::{Body, DynBody, S3Request, S3Response};
use crate::router::Route;
use crate::storage::StorageGateway;
use crate::{auth, ops, path, router};

/// The gateway service. Cheap to clone and share across connections.
#[derive(Clone)]
pub struct S3Bridge {
    config: Arc<BridgeConfig>,
    store: Arc<dyn StorageGateway>,
}

impl S3Bridge {
    #[must_use]
    pub fn new(config: Arc<BridgeConfig>, store: Arc<dyn StorageGateway>) -> Self {
        Self { config, store }
    }

    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Handles one request, translating every failure into an S3 error
    /// response.
    pub async fn handle(&self, req: S3Request) -> S3Response {
        let method = req.method.clone();
        let mut resp = match self.try_handle(req).await {
            Ok(resp) => resp,
            Err(err) => {
                if err.code() == S3ErrorCode::InternalError {
                    tracing::error!(error = ?err, "request failed");
                } else {
                    tracing::debug!(error = %err, "request rejected");
                }
                error_response(&err)
            }
        };
        resp.headers.insert(SERVER, HeaderValue::from_static("AmazonS3"));
        if method == Method::HEAD {
            resp.body = Body::Empty;
        }
        resp
    }

    async fn try_handle(&self, req: S3Request) -> S3Result<S3Response> {
        let now = OffsetDateTime::now_utc();
        if self.config.auth_enabled {
            auth::authenticate(&req, &self.config, now).into_result()?;
        }

        let sanitized_base = path::sanitize_filepath(&req.uri_path, self.config.max_filename_length)?;
        let addr = path::resolve_bucket_address(&sanitized_base, req.host.as_deref(), &self.config.base_subdomain);

        // On the base endpoint the first segment is the bucket; the rest is
        // the object path. With subdomain addressing the whole path is.
        let resolved_path = if addr.is_base_endpoint {
            let split = path::split_first_directory(&sanitized_base);
            if split.remaining.is_empty() {
                "/".to_owned()
            } else {
                split.remaining
            }
        } else {
            sanitized_base.clone()
        };

        let route = router::resolve(&req.method, &addr, &resolved_path, &req.qs, &req.headers)?;
        tracing::debug!(?route, path = %sanitized_base, base_endpoint = addr.is_base_endpoint, "request routed");
        self.dispatch(route, req).await
    }

    async fn dispatch(&self, route: Route, req: S3Request) -> S3Result<S3Response> {
        let config = &*self.config;
        let store = &*self.store;
        match route {
            Route::ListBuckets => ops::buckets::list_buckets(config, store).await,
            Route::BucketExists { bucket } => ops::buckets::bucket_exists(config, store, &bucket).await,
            Route::AddBucket { bucket } => ops::buckets::add_bucket(config, store, &bucket).await,
            Route::RemoveBucket { bucket } => ops::buckets::remove_bucket(config, store, &bucket).await,
            Route::ListObjects { bucket, prefix } => {
                ops::objects::list_objects(config, store, &bucket, prefix.as_deref()).await
            }
            Route::ListMultipartUploads { bucket } => ops::buckets::list_multipart_uploads(&bucket),
            Route::GetAcl { .. } => ops::buckets::get_acl(config),
            Route::PutAcl { .. } => ops::buckets::put_acl(),
            Route::GetObject { bucket, key } => ops::objects::get_object(config, store, &bucket, &key).await,
            Route::AddObject { bucket, key } => {
                ops::objects::add_object(config, store, &bucket, &key, &req.headers, req.body).await
            }
            Route::CreateDirectory { bucket, key } => {
                ops::objects::create_directory(config, store, &bucket, &key).await
            }
            Route::CopyObject { bucket, key } => {
                ops::objects::copy_object(config, store, &bucket, &key, &req.headers).await
            }
            Route::DeleteObject { bucket, key } => ops::objects::delete_object(config, store, &bucket, &key).await,
            Route::HeadAtRoot => Ok(S3Response::new(StatusCode::METHOD_NOT_ALLOWED)),
            Route::NotImplemented => Ok(S3Response::new(StatusCode::NOT_IMPLEMENTED)),
        }
    }

    /// hyper glue: converts the request, runs the pipeline and converts the
    /// response back.
    pub async fn serve_hyper(&self, req: hyper::Request<hyper::body::Incoming>) -> hyper::Response<DynBody> {
        let s3_req = match S3Request::from_http(req) {
            Ok(s3_req) => s3_req,
            Err(err) => return error_response(&err).into(),
        };
        self.handle(s3_req).await.into()
    }
}

/// Renders an [`S3Error`] as an XML error response.
#[must_use]
pub fn error_response(err: &S3Error) -> S3Response {
    let mut resp = S3Response::new(err.status_code());
    match err.to_xml() {
        Ok(xml) => {
            resp.headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/xml"));
            resp.body = Body::from(xml);
        }
        Err(ser_err) => {
            tracing::error!(error = %ser_err, "error body serialization failed");
            resp.status = StatusCode::INTERNAL_SERVER_ERROR;
        }
    }
    resp
}
