//! Human-readable status page

use crate::deploy::run::{Outcome, RunSnapshot};
use crate::utils::format_timestamp;

/// Number of output lines shown on the status page
pub const PAGE_OUTPUT_LINES: usize = 20;

const STYLE: &str = r#"
    body { font-family: Arial, sans-serif; max-width: 800px; margin: 50px auto; padding: 20px; background: #f5f5f5; }
    .container { background: white; padding: 30px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }
    h1 { color: #333; margin-top: 0; }
    .btn { display: inline-block; padding: 12px 24px; margin: 10px 5px; background: #007bff; color: white; text-decoration: none; border-radius: 4px; font-size: 16px; }
    .btn:hover { background: #0056b3; }
    .btn.secondary { background: #6c757d; }
    .btn.secondary:hover { background: #545b62; }
    .status { margin: 20px 0; padding: 15px; border-radius: 4px; background: #e9ecef; }
    .running { background: #fff3cd; border-left: 4px solid #ffc107; }
    .success { background: #d4edda; border-left: 4px solid #28a745; }
    .error { background: #f8d7da; border-left: 4px solid #dc3545; }
    pre { background: #f8f9fa; padding: 15px; border-radius: 4px; overflow-x: auto; font-size: 12px; }
    .info { color: #666; font-size: 14px; }
"#;

/// Banner shown at the top of the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Banner {
    Idle,
    Running,
    Success,
    Error,
}

impl Banner {
    pub fn for_snapshot(snapshot: &RunSnapshot) -> Self {
        if snapshot.running {
            return Banner::Running;
        }
        match snapshot.outcome {
            Outcome::Success => Banner::Success,
            Outcome::Failed | Outcome::Error => Banner::Error,
            Outcome::None => Banner::Idle,
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            Banner::Idle => "",
            Banner::Running => "running",
            Banner::Success => "success",
            Banner::Error => "error",
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            Banner::Idle => "Idle",
            Banner::Running => "Deployment in progress...",
            Banner::Success => "Completed successfully",
            Banner::Error => "Failed",
        }
    }
}

/// Render the status page for a snapshot
pub fn render_status_page(snapshot: &RunSnapshot) -> String {
    let banner = Banner::for_snapshot(snapshot);

    let mut details = format!("<strong>Status:</strong> {}<br>\n", banner.text());
    if let Some(started_at) = &snapshot.started_at {
        details.push_str(&format!(
            "<strong>Last started:</strong> {}<br>\n",
            format_timestamp(started_at)
        ));
    }
    if let Some(finished_at) = &snapshot.finished_at {
        details.push_str(&format!(
            "<strong>Finished:</strong> {}<br>\n",
            format_timestamp(finished_at)
        ));
    }
    if let Some(error) = &snapshot.error {
        details.push_str(&format!("<strong>Error:</strong> {}<br>\n", escape_html(error)));
    }

    let output = snapshot.last_output(PAGE_OUTPUT_LINES);
    let output_section = if output.is_empty() {
        String::new()
    } else {
        format!(
            "<h3>Output (latest lines):</h3>\n<pre>{}</pre>\n",
            escape_html(&output.join("\n"))
        )
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Deployment</title>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>{style}</style>
</head>
<body>
    <div class="container">
        <h1>Deployment</h1>
        <div>
            <a href="/deploy" class="btn">Start deployment</a>
            <a href="/status" class="btn secondary">Status (JSON)</a>
            <a href="/" class="btn secondary">Refresh</a>
        </div>
        <div class="status {class}">
{details}        </div>
{output_section}        <div class="info">
            <p><strong>API:</strong></p>
            <ul>
                <li><code>GET /deploy</code> - start a deployment</li>
                <li><code>GET /status</code> - current status (JSON)</li>
            </ul>
        </div>
    </div>
</body>
</html>
"#,
        style = STYLE,
        class = banner.css_class(),
        details = details,
        output_section = output_section,
    )
}

/// Escape text for use in HTML element content
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
