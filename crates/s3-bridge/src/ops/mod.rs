//! Operation handlers: `Route` + storage results to S3 responses.

pub mod buckets;
pub mod objects;

use crate::config::BridgeConfig;
use crate::http::OrderedHeaders;
use crate::xml;

/// Converts a base64 MD5 from the backing store into a quoted hex ETag.
pub(crate) fn md5_to_etag(content_md5: &str) -> Option<String> {
    let bytes = base64_simd::STANDARD.decode_to_vec(content_md5).ok()?;
    let hex = hex_simd::encode_to_string(bytes, hex_simd::AsciiCase::Lower);
    Some(format!("\"{hex}\""))
}

/// Collects `x-amz-meta-*` request headers as store metadata entries.
pub(crate) fn extract_user_metadata(headers: &OrderedHeaders) -> Vec<(String, String)> {
    headers
        .iter_pairs()
        .filter_map(|(name, value)| {
            name.strip_prefix("x-amz-meta-")
                .map(|key| (key.to_owned(), value.to_owned()))
        })
        .collect()
}

pub(crate) fn owner(config: &BridgeConfig) -> xml::Owner {
    xml::Owner {
        id: config.owner_id.clone(),
        display_name: config.display_name.clone(),
    }
}
