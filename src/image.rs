use url::{Position, Url};

/// Rewrites a raw upstream asset URL into its public proxy form. Data URIs
/// and Unsplash assets pass through untouched; presigned S3 URLs lose their
/// query string so the proxy can sign them itself.
pub fn map_image_url(raw: &str, block_id: &str) -> String {
    if raw.starts_with("data:") || raw.starts_with("https://images.unsplash.com") {
        return raw.to_string();
    }

    let mut url = raw.to_string();
    if let Ok(parsed) = Url::parse(&url) {
        let signed = ["X-Amz-Credential", "X-Amz-Signature", "X-Amz-Algorithm"]
            .iter()
            .all(|name| parsed.query_pairs().any(|(key, _)| key == *name));
        if signed {
            url = parsed[..Position::AfterPath].to_string();
        }
    }
    if url.starts_with("/images") {
        url = format!("https://www.notion.so{}", url);
    }

    format!(
        "https://www.notion.so/image/{}?table=block&id={}&cache=v2",
        urlencoding::encode(&url),
        block_id
    )
}
