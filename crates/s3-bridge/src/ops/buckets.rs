//! Bucket-level operations.

use hyper::StatusCode;
use hyper::header::LOCATION;

use super::owner;
use crate::config::BridgeConfig;
use crate::error::{S3Error, S3Result};
use crate::http::S3Response;
use crate::storage::{EntryKind, StorageGateway};
use crate::xml;

/// GET on the service root: every bucket directory under the bucket path.
pub async fn list_buckets(config: &BridgeConfig, store: &dyn StorageGateway) -> S3Result<S3Response> {
    let entries = match store.list(&config.bucket_path).await {
        Ok(entries) => entries,
        Err(err) if err.is_not_found() => Vec::new(),
        Err(err) => return Err(S3Error::internal_error(err)),
    };

    let buckets = entries
        .into_iter()
        .filter(|entry| entry.kind == EntryKind::Directory)
        .map(|entry| xml::Bucket {
            name: entry.name,
            creation_date: crate::time::fmt_rfc3339(entry.mtime),
        })
        .collect();

    let result = xml::ListAllMyBucketsResult {
        xmlns: xml::XMLNS,
        owner: owner(config),
        buckets: xml::Buckets { buckets },
    };
    let mut resp = S3Response::new(StatusCode::OK);
    resp.set_xml_body(&result)?;
    Ok(resp)
}

/// HEAD existence probe, 200 or 404 with no body.
pub async fn bucket_exists(config: &BridgeConfig, store: &dyn StorageGateway, bucket: &str) -> S3Result<S3Response> {
    match store.stat(&config.bucket_dir(bucket)).await {
        Ok(_) => Ok(S3Response::new(StatusCode::OK)),
        Err(err) if err.is_not_found() => Err(s3_error!(NoSuchBucket, "The specified bucket does not exist")),
        Err(err) => Err(S3Error::internal_error(err)),
    }
}

pub async fn add_bucket(config: &BridgeConfig, store: &dyn StorageGateway, bucket: &str) -> S3Result<S3Response> {
    let dir = config.bucket_dir(bucket);
    match store.stat(&dir).await {
        Ok(_) => {
            return Err(s3_error!(
                BucketAlreadyExists,
                "The requested bucket name is not available"
            ));
        }
        Err(err) if err.is_not_found() => {}
        Err(err) => return Err(S3Error::internal_error(err)),
    }
    store.mkdir_recursive(&dir).await.map_err(S3Error::internal_error)?;
    tracing::debug!(bucket, "bucket created");

    let mut resp = S3Response::new(StatusCode::OK);
    resp.set_header(LOCATION, &format!("/{bucket}"))?;
    Ok(resp)
}

pub async fn remove_bucket(config: &BridgeConfig, store: &dyn StorageGateway, bucket: &str) -> S3Result<S3Response> {
    let dir = config.bucket_dir(bucket);
    let children = match store.list(&dir).await {
        Ok(children) => children,
        Err(err) if err.is_not_found() => {
            return Err(s3_error!(NoSuchBucket, "The specified bucket does not exist"));
        }
        Err(err) => return Err(S3Error::internal_error(err)),
    };
    if !children.is_empty() {
        return Err(s3_error!(BucketNotEmpty, "The bucket you tried to delete is not empty"));
    }
    match store.remove_recursive(&dir).await {
        Ok(()) => Ok(S3Response::new(StatusCode::NO_CONTENT)),
        Err(err) if err.is_not_found() => Err(s3_error!(NoSuchBucket, "The specified bucket does not exist")),
        Err(err) => Err(S3Error::internal_error(err)),
    }
}

/// ACLs are not stored; every bucket reports its owner with full control.
pub fn get_acl(config: &BridgeConfig) -> S3Result<S3Response> {
    let owner = owner(config);
    let policy = xml::AccessControlPolicy {
        xmlns: xml::XMLNS,
        owner: owner.clone(),
        access_control_list: xml::AccessControlList {
            grants: vec![xml::Grant {
                grantee: xml::Grantee::canonical_user(owner.id, owner.display_name),
                permission: "FULL_CONTROL".to_owned(),
            }],
        },
    };
    let mut resp = S3Response::new(StatusCode::OK);
    resp.set_xml_body(&policy)?;
    Ok(resp)
}

/// Accepted and discarded.
pub fn put_acl() -> S3Result<S3Response> {
    Ok(S3Response::new(StatusCode::OK))
}

/// Multipart uploads are unsupported; the listing is always empty.
pub fn list_multipart_uploads(bucket: &str) -> S3Result<S3Response> {
    let result = xml::ListMultipartUploadsResult {
        xmlns: xml::XMLNS,
        bucket: bucket.to_owned(),
        key_marker: String::new(),
        upload_id_marker: String::new(),
        max_uploads: 1000,
        is_truncated: false,
    };
    let mut resp = S3Response::new(StatusCode::OK);
    resp.set_xml_body(&result)?;
    Ok(resp)
}
