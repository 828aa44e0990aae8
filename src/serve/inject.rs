// src/serve/inject.rs

/// URL of the SSE stream the client listens on.
pub const EVENTS_PATH: &str = "/__sitedag/events";

/// URL the client script is served from.
pub const CLIENT_PATH: &str = "/__sitedag/client.js";

/// Tag injected into every HTML page.
pub const CLIENT_SCRIPT_TAG: &str = r#"<script src="/__sitedag/client.js"></script>"#;

/// Reloads the page on every `reload` event.
pub const CLIENT_JS: &str = r#"(function () {
  var source = new EventSource("/__sitedag/events");
  source.addEventListener("reload", function () {
    window.location.reload();
  });
})();
"#;

/// Insert `snippet` before the last `</body>` (case-insensitive), or append
/// it when the document has no closing body tag.
pub fn inject_before_body_end(html: &str, snippet: &str) -> String {
    // ASCII lowercasing keeps byte offsets intact.
    let lowered = html.to_ascii_lowercase();
    let mut out = String::with_capacity(html.len() + snippet.len());
    match lowered.rfind("</body>") {
        Some(idx) => {
            out.push_str(&html[..idx]);
            out.push_str(snippet);
            out.push_str(&html[idx..]);
        }
        None => {
            out.push_str(html);
            out.push_str(snippet);
        }
    }
    out
}
