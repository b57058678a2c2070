//! Server-rendered pages.

use chrono::{DateTime, Utc};
use edge_core::{APP_DESCRIPTION, APP_NAME};

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:0;background:#0f172a;color:#e2e8f0}\
main{max-width:40rem;margin:4rem auto;padding:0 1rem}\
nav a{color:#38bdf8;margin-right:1rem}\
.clock{font-size:2.5rem;font-variant-numeric:tabular-nums}\
.region{color:#94a3b8}";

/// Head content for the shell.
#[derive(Debug, Clone, Default)]
pub struct HeadContent {
    /// Page title.
    pub title: String,
    /// Meta tags.
    pub meta: Vec<(String, String)>,
}

impl HeadContent {
    /// Create new head content with a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            meta: Vec::new(),
        }
    }

    /// Add a meta tag.
    pub fn with_meta(mut self, name: &str, content: &str) -> Self {
        self.meta.push((name.to_string(), content.to_string()));
        self
    }

    /// Render head content to HTML.
    pub fn render(&self) -> String {
        let mut html = format!("<title>{}</title>\n", html_escape(&self.title));

        for (name, content) in &self.meta {
            html.push_str(&format!(
                r#"<meta name="{}" content="{}">"#,
                html_escape(name),
                html_escape(content)
            ));
            html.push('\n');
        }

        html.push_str(&format!("<style>{}</style>\n", STYLE));
        html
    }
}

/// Page shell shared by every page.
#[derive(Debug, Clone)]
pub struct Shell {
    head: HeadContent,
}

impl Shell {
    /// Create the standard shell.
    pub fn new() -> Self {
        Self {
            head: HeadContent::new(APP_NAME)
                .with_meta("viewport", "width=device-width, initial-scale=1")
                .with_meta("description", APP_DESCRIPTION),
        }
    }

    /// Wrap `body` in the full document.
    pub fn render(&self, body: &str) -> String {
        format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n{}</head>\n<body>\n<main>\n<nav><a href=\"/\">Home</a><a href=\"/about\">About</a></nav>\n{}\n</main>\n</body>\n</html>",
            self.head.render(),
            body
        )
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}

/// Render the homepage.
pub fn render_homepage(now: DateTime<Utc>, region_name: &str) -> String {
    Shell::new().render(&format!(
        r#"<section data-section="clock">
    <h1>{}</h1>
    <p class="clock"><time datetime="{}">{}</time></p>
    <p class="region">Rendered in {}</p>
</section>"#,
        html_escape(APP_NAME),
        now.to_rfc3339(),
        now.format("%H:%M:%S UTC"),
        html_escape(region_name)
    ))
}

/// Render the about page.
pub fn render_about() -> String {
    Shell::new().render(&format!(
        r#"<section data-section="about">
    <h1>About {}</h1>
    <p>{}.</p>
    <p>Each page is rendered on the server. The homepage clock is cached at the
    edge for ten seconds; this page for an hour. Visit counts are written to a
    primary region and move to the disaster-recovery region when the primary
    is unreachable.</p>
</section>"#,
        html_escape(APP_NAME),
        html_escape(APP_DESCRIPTION)
    ))
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
