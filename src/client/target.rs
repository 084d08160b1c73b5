/// WebSocket URL of the feed served by `host`.
///
/// `host` is used verbatim, including any port (`example.com:8080`).
pub fn feed_url(host: &str) -> String {
    format!("ws://{}/ws", host)
}

/// WebSocket URL of a shared document feed (`/ws/{doc_id}`).
pub fn shared_feed_url(host: &str, doc_id: &str) -> String {
    format!("ws://{}/ws/{}", host, doc_id)
}
