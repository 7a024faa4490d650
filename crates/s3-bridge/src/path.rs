//! Bucket and path resolution.
//!
//! S3 clients address buckets two ways: as a host subdomain
//! (`mybucket.s3.example.com/key`) or as the first path segment on the base
//! endpoint (`s3.example.com/mybucket/key`). The functions here reconcile the
//! two conventions before canonicalization and routing.

use crate::error::{S3Error, S3Result};

/// Result of splitting a normalized path at the first interior `/`.
///
/// `first` keeps its leading slash; `remaining` never starts with one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPath {
    pub first: String,
    pub remaining: String,
}

/// Where the bucket name came from and whether the request used the base
/// endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketAddress {
    /// `None` when no bucket could be determined. Never contains a slash.
    pub bucket: Option<String>,
    /// True when the host carries no bucket subdomain (bucket, if any, comes
    /// from the first path segment).
    pub is_base_endpoint: bool,
}

/// Strips a trailing `:port` from a `Host` header value.
#[must_use]
pub fn parse_domain_from_host_with_port(host: &str) -> &str {
    match host.find(':') {
        Some(idx) => &host[..idx],
        None => host,
    }
}

/// Extracts the subdomain label from a domain.
///
/// `www.example.com` gives `www`. A single-label remainder only counts when
/// it is the literal `localhost`, so `bucket.localhost` gives `bucket` while
/// `example.com` gives `None`.
#[must_use]
pub fn parse_subdomain(domain: &str) -> Option<&str> {
    if domain.is_empty() || domain.starts_with('.') {
        return None;
    }
    let first_dot = domain.find('.')?;
    let remainder = &domain[first_dot + 1..];
    if remainder.contains('.') || remainder == "localhost" {
        return Some(&domain[..first_dot]);
    }
    None
}

/// Normalizes a path, collapsing `.`/`..`/repeated slashes and resolving
/// relative to the root.
///
/// The result is always absolute. A trailing slash is preserved unless the
/// result is the root itself.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let trailing_slash = path.ends_with('/');
    let mut stack: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            segment => stack.push(segment),
        }
    }
    if stack.is_empty() {
        return "/".to_owned();
    }
    let mut out = String::with_capacity(path.len());
    for segment in &stack {
        out.push('/');
        out.push_str(segment);
    }
    if trailing_slash {
        out.push('/');
    }
    out
}

/// Splits a path into its first directory and the rest. The path is
/// normalized first.
#[must_use]
pub fn split_first_directory(path: &str) -> SplitPath {
    let normalized = normalize_path(path);
    if normalized == "/" {
        return SplitPath {
            first: "/".to_owned(),
            remaining: String::new(),
        };
    }
    match normalized[1..].find('/') {
        None => SplitPath {
            first: normalized,
            remaining: String::new(),
        },
        Some(idx) => SplitPath {
            first: normalized[..=idx].to_owned(),
            remaining: normalized[idx + 2..].to_owned(),
        },
    }
}

/// Derives the bucket name from the host subdomain or the first path
/// segment.
///
/// The subdomain wins only when it is longer than one character and differs
/// from the configured base subdomain. Otherwise the first path segment is
/// used; an empty derivation gives `None`.
#[must_use]
pub fn find_bucket_name(path: &str, host: Option<&str>, base_subdomain: &str) -> Option<String> {
    let subdomain = host.map(parse_domain_from_host_with_port).and_then(parse_subdomain);

    if let Some(subdomain) = subdomain
        && subdomain.len() > 1
        && subdomain != base_subdomain
    {
        return Some(subdomain.to_owned());
    }

    if path.is_empty() {
        return None;
    }
    let first = split_first_directory(path).first;
    let bucket = first.trim_matches('/');
    if bucket.is_empty() { None } else { Some(bucket.to_owned()) }
}

/// Resolves the full [`BucketAddress`] for a request.
#[must_use]
pub fn resolve_bucket_address(path: &str, host: Option<&str>, base_subdomain: &str) -> BucketAddress {
    let subdomain = host.map(parse_domain_from_host_with_port).and_then(parse_subdomain);
    let is_base_endpoint = match subdomain {
        None => true,
        Some(subdomain) => subdomain == base_subdomain,
    };
    BucketAddress {
        bucket: find_bucket_name(path, host, base_subdomain),
        is_base_endpoint,
    }
}

/// Sanitizes a client-supplied filepath before it touches the backing store.
///
/// Rejects over-long paths, trims surrounding whitespace, strips ASCII
/// control characters, resolves `.`/`..` relative to the root and collapses
/// repeated slashes. A trailing slash survives sanitization.
///
/// # Errors
/// Returns `InvalidArgument` if the path exceeds `max_length`
pub fn sanitize_filepath(path: &str, max_length: usize) -> S3Result<String> {
    if path.len() > max_length {
        return Err(S3Error::invalid_argument(
            "path",
            path,
            format!("Path length exceeds the maximum of {max_length} characters"),
        ));
    }
    let cleaned: String = path.trim().chars().filter(|&c| !is_stripped_control(c)).collect();
    Ok(normalize_path(&cleaned))
}

fn is_stripped_control(c: char) -> bool {
    matches!(u32::from(c), 0x00..=0x1F | 0x80..=0x9F)
}
