//! Feed documents and image payloads served by the mock server

use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// PNG signature followed by the start of an IHDR chunk
pub const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
];

/// Minimal GIF89a header
pub const GIF_BYTES: &[u8] = b"GIF89a\x01\x00\x01\x00\x00\x00\x00";

/// Listing entry whose domain and URL point at the mock image host
pub fn image_entry(server: &MockServer, file_name: &str, channel: &str) -> Value {
    json!({
        "kind": "t3",
        "data": {
            "domain": "127.0.0.1",
            "url": format!("{}/{}", server.uri(), file_name),
            "author": "poster",
            "id": file_name.split('.').next().unwrap_or_default(),
            "permalink": format!("/r/{channel}/comments/{file_name}/"),
            "title": format!("post {file_name}"),
            "subreddit": channel,
        }
    })
}

/// Listing entry linking somewhere other than the image host
pub fn foreign_entry(url: &str, domain: &str) -> Value {
    json!({
        "kind": "t3",
        "data": {
            "domain": domain,
            "url": url,
            "author": "poster",
            "id": "foreign",
            "permalink": "/r/x/comments/foreign/",
            "title": "not an image",
        }
    })
}

/// Serve a single-page listing for `channel` on the default feed
pub async fn mount_feed(server: &MockServer, channel: &str, children: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path(format!("/r/{channel}/.json")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({
                "kind": "Listing",
                "data": { "children": children, "after": null }
            })),
        )
        .mount(server)
        .await;
}

/// Serve `body` for an image, expecting exactly `times` requests
///
/// The image host is asked for `<url>.png`, so `file_name` gets the suffix here.
pub async fn mount_image(server: &MockServer, file_name: &str, body: &[u8], times: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/{file_name}.png")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .expect(times)
        .mount(server)
        .await;
}
