// Copyright © 2024 Twinpress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Post-processing of rendered documents and template file access.
//!
//! Build output must not carry the live-reload hooks a theme includes for
//! development. Each hook is a [`DevMarker`]: an exact fragment removed from
//! the rendered text wherever it appears. A line left blank by a removal is
//! dropped entirely; lines that were blank in the rendered output survive.

use std::fs;
use std::path::Path;

use crate::{Result, TwinpressError};

/// Request path of the live-reload client script.
pub const LIVE_RELOAD_SCRIPT_PATH: &str = "/__twinpress/live-reload.js";

/// Request path of the live-reload WebSocket.
pub const LIVE_RELOAD_SOCKET_PATH: &str = "/__twinpress/live-reload";

/// A fragment of development-only markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevMarker {
    fragment: String,
}

impl DevMarker {
    /// A marker matching `fragment` exactly.
    pub fn new<S: Into<String>>(fragment: S) -> Self {
        Self {
            fragment: fragment.into(),
        }
    }

    /// The fragment this marker removes.
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Whether `text` contains the marker.
    pub fn matches(&self, text: &str) -> bool {
        !self.fragment.is_empty() && text.contains(&self.fragment)
    }

    /// `text` with every occurrence of the marker removed.
    pub fn remove_from(&self, text: &str) -> String {
        if self.fragment.is_empty() {
            return text.to_string();
        }
        text.replace(&self.fragment, "")
    }
}

/// The markers every theme is checked for: the live-reload script tag and
/// the two sentinel comments that surround it.
pub fn builtin_markers() -> Vec<DevMarker> {
    vec![
        DevMarker::new(format!(
            r#"<script type="module" src="{}"></script>"#,
            LIVE_RELOAD_SCRIPT_PATH
        )),
        DevMarker::new("<!-- Live reload client -->"),
        DevMarker::new("<!-- Remove this block when integrating the theme -->"),
    ]
}

/// Built-in markers plus `extra` fragments from the configuration.
pub fn markers_with(extra: &[String]) -> Vec<DevMarker> {
    let mut markers = builtin_markers();
    markers.extend(
        extra
            .iter()
            .filter(|fragment| !fragment.trim().is_empty())
            .map(DevMarker::new),
    );
    markers
}

/// Removes every marker from `html`, line by line.
///
/// Line endings are preserved. A line that becomes whitespace-only because
/// a marker was removed from it is dropped along with its line ending.
pub fn strip_dev_markup(html: &str, markers: &[DevMarker]) -> String {
    let mut output = String::with_capacity(html.len());
    for line in html.split_inclusive('\n') {
        let (body, ending) = split_line_ending(line);
        if !markers.iter().any(|m| m.matches(body)) {
            output.push_str(line);
            continue;
        }
        let stripped = markers
            .iter()
            .fold(body.to_string(), |text, marker| marker.remove_from(&text));
        if stripped.trim().is_empty() {
            continue;
        }
        output.push_str(&stripped);
        output.push_str(ending);
    }
    output
}

fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

/// Reads a template file.
///
/// # Errors
///
/// Returns a `TwinpressError::IOError` naming the path when the file cannot
/// be read or is not valid UTF-8.
pub fn read_template<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path).map_err(|e| TwinpressError::io_error(path.to_path_buf(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const THEME_HEAD: &str = "<head>\n  <title>x</title>\n  <!-- Live reload client -->\n  <script type=\"module\" src=\"/__twinpress/live-reload.js\"></script>\n</head>\n";

    #[test]
    fn test_strips_builtin_markers() {
        let stripped = strip_dev_markup(THEME_HEAD, &builtin_markers());
        assert_eq!(stripped, "<head>\n  <title>x</title>\n</head>\n");
    }

    #[test]
    fn test_each_marker_independently() {
        for marker in builtin_markers() {
            let html = format!("<body>\n{}\n<p>kept</p>\n</body>", marker.fragment());
            let stripped = strip_dev_markup(&html, std::slice::from_ref(&marker));
            assert_eq!(stripped, "<body>\n<p>kept</p>\n</body>");
        }
    }

    #[test]
    fn test_inline_marker_keeps_rest_of_line() {
        let html = "<p>a</p><!-- Remove this block when integrating the theme --><p>b</p>\n";
        let stripped = strip_dev_markup(html, &builtin_markers());
        assert_eq!(stripped, "<p>a</p><p>b</p>\n");
    }

    #[test]
    fn test_unmarked_document_is_unchanged() {
        let html = "<html>\r\n\r\n<body></body>\r\n</html>";
        assert_eq!(strip_dev_markup(html, &builtin_markers()), html);
    }

    #[test]
    fn test_configured_markers() {
        let markers = markers_with(&["<!-- dev -->".to_string(), "  ".to_string()]);
        assert_eq!(markers.len(), 4);
        let stripped = strip_dev_markup("a\n<!-- dev -->\nb", &markers);
        assert_eq!(stripped, "a\nb");
    }

    #[test]
    fn test_read_template() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("index.html");
        fs::write(&path, "<h1>{{siteTitle}}</h1>").unwrap();

        assert_eq!(read_template(&path).unwrap(), "<h1>{{siteTitle}}</h1>");
        assert!(matches!(
            read_template(temp_dir.path().join("missing.html")),
            Err(TwinpressError::IOError { .. })
        ));
    }
}
