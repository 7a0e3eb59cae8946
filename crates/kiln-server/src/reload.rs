//! Live reload over WebSocket.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// WebSocket endpoint the client connects to.
pub const RELOAD_SOCKET_PATH: &str = "/__kiln/reload";

/// URL of the client script.
pub const RELOAD_SCRIPT_PATH: &str = "/__kiln/reload.js";

/// Messages sent to connected browsers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Connection established
    Connected,

    /// Output changed; reload the page
    Reload {
        /// Changed files
        paths: Vec<String>,
    },
}

/// Broadcasts reload messages to every connected client.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Send to all clients. A hub with no clients drops the message.
    pub fn send(&self, msg: ReloadMessage) {
        let _ = self.sender.send(msg);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    /// Number of connected clients.
    pub fn client_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// The tag injected into served pages.
pub fn reload_script_tag() -> String {
    format!(r#"<script src="{}"></script>"#, RELOAD_SCRIPT_PATH)
}

/// Client-side live reload script. Connects back to the serving host.
pub fn reload_client_script() -> String {
    format!(
        r#"(function() {{
  'use strict';

  var protocol = location.protocol === 'https:' ? 'wss:' : 'ws:';
  var url = protocol + '//' + location.host + '{}';
  var attempts = 0;

  function connect() {{
    var ws = new WebSocket(url);

    ws.onopen = function() {{
      if (attempts > 0) {{
        location.reload();
        return;
      }}
      console.log('[kiln] live reload connected');
    }};

    ws.onmessage = function(event) {{
      var msg = JSON.parse(event.data);
      if (msg.type === 'reload') {{
        console.log('[kiln] changed:', msg.paths.join(', '));
        location.reload();
      }}
    }};

    ws.onclose = function() {{
      if (attempts < 10) {{
        attempts++;
        setTimeout(connect, 1000 * attempts);
      }}
    }};
  }}

  connect();
}})();
"#,
        RELOAD_SOCKET_PATH
    )
}

/// Insert the reload tag before `</body>`, or append it when there is none.
pub fn inject_reload_script(html: &str) -> String {
    let tag = reload_script_tag();
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(at) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..at]);
            out.push_str(&tag);
            out.push_str(&html[at..]);
            out
        }
        None => format!("{}{}", html, tag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn hub_broadcasts_to_subscribers() {
        let hub = ReloadHub::new();
        let mut rx = hub.subscribe();

        hub.send(ReloadMessage::Reload {
            paths: vec!["dist/index.html".to_string()],
        });

        match rx.try_recv() {
            Ok(ReloadMessage::Reload { paths }) => assert_eq!(paths, vec!["dist/index.html"]),
            other => panic!("Expected Reload message, got {other:?}"),
        }
        assert_eq!(hub.client_count(), 1);
    }

    #[test]
    fn serializes_tagged_messages() {
        let json = serde_json::to_string(&ReloadMessage::Reload {
            paths: vec!["a.css".to_string()],
        })
        .unwrap();

        assert_eq!(json, r#"{"type":"reload","paths":["a.css"]}"#);
    }

    #[test]
    fn injects_before_closing_body() {
        let html = "<html><BODY><p>x</p></BODY></html>";

        assert_eq!(
            inject_reload_script(html),
            r#"<html><BODY><p>x</p><script src="/__kiln/reload.js"></script></BODY></html>"#
        );
    }

    #[test]
    fn appends_without_body() {
        assert_eq!(
            inject_reload_script("<p>x</p>"),
            r#"<p>x</p><script src="/__kiln/reload.js"></script>"#
        );
    }

    #[test]
    fn client_targets_socket_path() {
        assert!(reload_client_script().contains("/__kiln/reload'"));
    }
}
