//! Error overlay served when no successful pass exists yet.
//!
//! Once a pass has succeeded, its shell stays live across failed rebuilds
//! and errors travel to the browser console over SSE instead; the overlay
//! is only the first impression when the very first pass fails.

/// Full-page error overlay. Subscribes to the event stream so the page
/// reloads itself as soon as a pass succeeds.
pub fn overlay_page(error: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <title>Build failed</title>
    <style>
      body {{ margin: 0; background: #1e1e1e; color: #e8e8e8; font-family: ui-monospace, monospace; }}
      header {{ background: #d32f2f; color: #fff; padding: 12px 20px; font-weight: bold; }}
      pre {{ padding: 20px; white-space: pre-wrap; word-break: break-word; line-height: 1.5; }}
    </style>
  </head>
  <body>
    <header>Build failed</header>
    <pre>{error}</pre>
    <script src="/__plinth_reload__.js"></script>
  </body>
</html>
"#,
        error = escape_html(error)
    )
}

/// Inject the reload client into a served shell, just before `</body>`.
pub fn inject_reload(shell: &str) -> String {
    const TAG: &str = "<script src=\"/__plinth_reload__.js\"></script>";
    match shell.rfind("</body>") {
        Some(at) => {
            let mut out = String::with_capacity(shell.len() + TAG.len() + 1);
            out.push_str(&shell[..at]);
            out.push_str(TAG);
            out.push('\n');
            out.push_str(&shell[at..]);
            out
        }
        None => format!("{shell}\n{TAG}"),
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
