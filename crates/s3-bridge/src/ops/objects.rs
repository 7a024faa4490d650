//! Object-level operations.

use hyper::StatusCode;
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE, ETAG, HeaderName, LAST_MODIFIED};

use super::{extract_user_metadata, md5_to_etag, owner};
use crate::config::BridgeConfig;
use crate::error::{S3Error, S3Result};
use crate::http::{Body, OrderedHeaders, S3Response};
use crate::storage::{EntryKind, PutOptions, StorageGateway};
use crate::xml;

const STORAGE_CLASS_HEADER: HeaderName = HeaderName::from_static("x-amz-storage-class");
const DELETE_MARKER_HEADER: HeaderName = HeaderName::from_static("x-amz-delete-marker");

fn object_path(config: &BridgeConfig, bucket: &str, key: &str) -> String {
    format!("{}/{key}", config.bucket_dir(bucket))
}

fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

pub async fn add_object(
    config: &BridgeConfig,
    store: &dyn StorageGateway,
    bucket: &str,
    key: &str,
    headers: &OrderedHeaders,
    body: Body,
) -> S3Result<S3Response> {
    let path = object_path(config, bucket, key);

    // create missing intermediate directories for nested keys
    let parent = parent_dir(&path);
    match store.stat(parent).await {
        Ok(_) => {}
        Err(err) if err.is_not_found() => {
            store.mkdir_recursive(parent).await.map_err(S3Error::internal_error)?;
        }
        Err(err) => return Err(S3Error::internal_error(err)),
    }

    let opts = PutOptions {
        content_length: headers.get("content-length").and_then(|v| v.parse().ok()),
        content_type: headers.get("content-type").map(str::to_owned),
        content_md5: headers.get("content-md5").map(str::to_owned),
        durability: Some(config.durability_for(headers.get("x-amz-storage-class"))),
        metadata: extract_user_metadata(headers),
    };
    let outcome = store.put_stream(&path, body, opts).await.map_err(S3Error::internal_error)?;
    tracing::debug!(bucket, key, "object stored");

    let mut resp = S3Response::new(StatusCode::OK);
    if let Some(md5) = outcome.content_md5.as_deref()
        && let Some(etag) = md5_to_etag(md5)
    {
        resp.set_header(ETAG, &etag)?;
    }
    Ok(resp)
}

/// Distinguishes a missing key from a missing bucket for 404 diagnostics.
async fn missing_key_error(config: &BridgeConfig, store: &dyn StorageGateway, bucket: &str) -> S3Error {
    match store.stat(&config.bucket_dir(bucket)).await {
        Err(err) if err.is_not_found() => s3_error!(NoSuchBucket, "The specified bucket does not exist"),
        _ => s3_error!(NotFound, "The specified key does not exist"),
    }
}

pub async fn get_object(
    config: &BridgeConfig,
    store: &dyn StorageGateway,
    bucket: &str,
    key: &str,
) -> S3Result<S3Response> {
    let path = object_path(config, bucket, key);
    let object = match store.get_stream(&path).await {
        Ok(object) => object,
        Err(err) if err.is_not_found() => {
            return Err(missing_key_error(config, store, bucket).await);
        }
        Err(err) => return Err(S3Error::internal_error(err)),
    };
    // directories are never returned as objects
    if object.info.kind == EntryKind::Directory {
        return Err(s3_error!(NotFound, "The specified key does not exist"));
    }

    let info = object.info;
    let mut resp = S3Response::with_body(StatusCode::OK, object.body);
    let content_type = info
        .content_type
        .as_deref()
        .unwrap_or(mime::APPLICATION_OCTET_STREAM.as_ref());
    resp.set_header(CONTENT_TYPE, content_type)?;
    if let Some(size) = info.size {
        resp.set_header(CONTENT_LENGTH, &size.to_string())?;
    }
    if let Some(mtime) = info.mtime {
        resp.set_header(LAST_MODIFIED, &crate::time::fmt_http_date(mtime))?;
    }
    if let Some(md5) = info.content_md5.as_deref()
        && let Some(etag) = md5_to_etag(md5)
    {
        resp.set_header(ETAG, &etag)?;
    }
    resp.set_header(STORAGE_CLASS_HEADER, config.storage_class_for(info.durability))?;
    for (key, value) in &info.metadata {
        let name = HeaderName::from_bytes(format!("x-amz-meta-{key}").as_bytes()).map_err(S3Error::internal_error)?;
        resp.set_header(name, value)?;
    }
    Ok(resp)
}

pub async fn delete_object(
    config: &BridgeConfig,
    store: &dyn StorageGateway,
    bucket: &str,
    key: &str,
) -> S3Result<S3Response> {
    let path = object_path(config, bucket, key);
    match store.unlink(&path).await {
        Ok(()) => {}
        Err(err) if err.is_not_found() => {
            return Err(s3_error!(NotFound, "The specified key does not exist"));
        }
        Err(err) => return Err(S3Error::internal_error(err)),
    }
    let mut resp = S3Response::new(StatusCode::NO_CONTENT);
    resp.set_header(DELETE_MARKER_HEADER, "false")?;
    Ok(resp)
}

/// PUT with a trailing slash: a directory placeholder, no content.
pub async fn create_directory(
    config: &BridgeConfig,
    store: &dyn StorageGateway,
    bucket: &str,
    key: &str,
) -> S3Result<S3Response> {
    let path = object_path(config, bucket, key.trim_end_matches('/'));
    store.mkdir_recursive(&path).await.map_err(S3Error::internal_error)?;
    Ok(S3Response::new(StatusCode::OK))
}

/// Server-side copy via a backing-store hard link.
pub async fn copy_object(
    config: &BridgeConfig,
    store: &dyn StorageGateway,
    bucket: &str,
    key: &str,
    headers: &OrderedHeaders,
) -> S3Result<S3Response> {
    let Some(source) = headers.get("x-amz-copy-source") else {
        return Err(S3Error::invalid_argument(
            "x-amz-copy-source",
            "",
            "A copy request must carry the x-amz-copy-source header",
        ));
    };
    let source = crate::path::sanitize_filepath(source, config.max_filename_length)?;
    let src_path = format!("{}{source}", config.bucket_path);

    let info = match store.stat(&src_path).await {
        Ok(info) => info,
        Err(err) if err.is_not_found() => {
            return Err(s3_error!(NotFound, "The specified key does not exist"));
        }
        Err(err) => return Err(S3Error::internal_error(err)),
    };

    let dst_path = object_path(config, bucket, key);
    let parent = parent_dir(&dst_path);
    match store.stat(parent).await {
        Ok(_) => {}
        Err(err) if err.is_not_found() => {
            store.mkdir_recursive(parent).await.map_err(S3Error::internal_error)?;
        }
        Err(err) => return Err(S3Error::internal_error(err)),
    }
    store.hard_link(&src_path, &dst_path).await.map_err(S3Error::internal_error)?;
    tracing::debug!(src = %src_path, dst = %dst_path, "object copied");

    let result = xml::CopyObjectResult {
        xmlns: xml::XMLNS,
        last_modified: info.mtime.map(crate::time::fmt_rfc3339).unwrap_or_default(),
        etag: info
            .content_md5
            .as_deref()
            .and_then(md5_to_etag)
            .unwrap_or_default(),
    };
    let mut resp = S3Response::new(StatusCode::OK);
    resp.set_xml_body(&result)?;
    Ok(resp)
}

/// GET at the bucket root: list the bucket, honoring the `prefix` query.
///
/// A prefix splits into a subdirectory part and a filename search prefix at
/// its last `/`; listing runs in `bucket/subdir` and files are filtered by
/// the search prefix. Subdirectories surface as `CommonPrefixes`.
pub async fn list_objects(
    config: &BridgeConfig,
    store: &dyn StorageGateway,
    bucket: &str,
    prefix: Option<&str>,
) -> S3Result<S3Response> {
    let prefix = prefix.unwrap_or_default();

    let mut contents = Vec::new();
    let mut common_prefixes = Vec::new();

    // a prefix with a double slash can never match a normalized path
    if !prefix.contains("//") {
        let (subdir, search_prefix) = match prefix.rfind('/') {
            Some(idx) => (&prefix[..idx], &prefix[idx + 1..]),
            None => ("", prefix),
        };
        let list_dir = if subdir.is_empty() {
            config.bucket_dir(bucket)
        } else {
            format!("{}/{subdir}", config.bucket_dir(bucket))
        };

        let entries = match store.list(&list_dir).await {
            Ok(entries) => entries,
            Err(err) if err.is_not_found() => {
                return Err(s3_error!(NoSuchBucket, "The specified bucket does not exist"));
            }
            Err(err) => return Err(S3Error::internal_error(err)),
        };

        for entry in entries {
            let relative = if subdir.is_empty() {
                entry.name.clone()
            } else {
                format!("{subdir}/{}", entry.name)
            };
            match entry.kind {
                EntryKind::File => {
                    if search_prefix.is_empty() || entry.name.starts_with(search_prefix) {
                        contents.push(xml::Contents {
                            key: relative,
                            last_modified: crate::time::fmt_rfc3339(entry.mtime),
                            etag: String::new(),
                            size: entry.size,
                            storage_class: config.storage_class_for(entry.durability).to_owned(),
                            owner: owner(config),
                        });
                    }
                }
                EntryKind::Directory => {
                    common_prefixes.push(xml::CommonPrefix {
                        prefix: format!("{relative}/"),
                    });
                }
            }
        }
    }

    let result = xml::ListBucketResult {
        xmlns: xml::XMLNS,
        name: bucket.to_owned(),
        prefix: prefix.to_owned(),
        marker: String::new(),
        max_keys: 1000,
        is_truncated: false,
        contents,
        common_prefixes,
    };
    let mut resp = S3Response::new(StatusCode::OK);
    resp.set_xml_body(&result)?;
    Ok(resp)
}
