// Copyright © 2024 Twinpress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Dev Request Handler
//!
//! Each request is classified into a [`Route`] and answered without touching
//! shared state, apart from reading the current navigation:
//!
//! | Request | Route | Response |
//! |---------|-------|----------|
//! | `/`, `/index.html` | [`Route::Index`] | rendered index |
//! | `/pages/<id>` | [`Route::Page`] | rendered page, or 404 naming the page |
//! | `/<path>.html` | [`Route::Template`] | rendered template if the file exists |
//! | anything else | [`Route::Unmatched`] | next handler |
//!
//! A render failure answers 500 with the diagnostic document.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Response};
use log::{debug, error, warn};
use percent_encoding::percent_decode_str;

use crate::content::find_page;
use crate::context::{PageOverrides, RenderContext};
use crate::process::read_template;
use crate::server::state::DevSite;
use crate::template::RenderResult;
use crate::urls::{Mode, INDEX_DOCUMENT, PAGES_MOUNT};
use crate::TwinpressError;

/// Classification of a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The root or the index document.
    Index,
    /// A page by identifier.
    Page(String),
    /// Another template, relative to the template root.
    Template(String),
    /// Not ours.
    Unmatched,
}

/// Classifies `path` for a site whose content files carry `extension`.
///
/// Any query string is ignored. Page identifiers and template paths are
/// percent-decoded; a page identifier is otherwise taken as is, so
/// `/pages/about.html` names a page `about.html`.
pub fn classify(path: &str, extension: &str) -> Route {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    if path == "/" || path.strip_prefix('/') == Some(INDEX_DOCUMENT) {
        return Route::Index;
    }

    if let Some(id) = path
        .strip_prefix(PAGES_MOUNT)
        .and_then(|rest| rest.strip_prefix('/'))
    {
        return Route::Page(decode(id.trim_end_matches('/')));
    }

    if path.ends_with(format!(".{}", extension).as_str()) {
        return Route::Template(decode(path.trim_start_matches('/')));
    }
    Route::Unmatched
}

fn decode(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// What the handler decided for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DevResponse {
    /// 200 with rendered HTML.
    Html(String),
    /// 500 with the diagnostic document.
    RenderFailed(String),
    /// 404 with a message naming the missing page.
    NotFound(String),
    /// Hand the request to the next handler.
    PassThrough,
}

impl IntoResponse for DevResponse {
    fn into_response(self) -> Response {
        match self {
            DevResponse::Html(html) => Html(html).into_response(),
            DevResponse::RenderFailed(diagnostic) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Html(diagnostic)).into_response()
            }
            DevResponse::NotFound(message) => {
                (StatusCode::NOT_FOUND, message).into_response()
            }
            DevResponse::PassThrough => StatusCode::NOT_FOUND.into_response(),
        }
    }
}

/// Answers `path` for `site`.
pub fn respond(site: &DevSite, path: &str) -> DevResponse {
    let config = site.config();
    let extension = site.renderer().render_config().content_extension();

    match classify(path, extension) {
        Route::Index => render_file(site, &config.index_path(), PageOverrides::default()),
        Route::Page(id) => match find_page(&config.pages_path(), &id, extension) {
            Some(page) => {
                let overrides = PageOverrides::for_page(&page, &config.site.title);
                render_file(site, &page.source, overrides)
            }
            None => {
                debug!("No content file for page '{}'", id);
                DevResponse::NotFound(format!("Page not found: {}/{}", PAGES_MOUNT, id))
            }
        },
        Route::Template(relative) => match template_path(&config.template_dir, &relative) {
            Some(path) if path.is_file() => {
                render_file(site, &path, PageOverrides::default())
            }
            _ => DevResponse::PassThrough,
        },
        Route::Unmatched => DevResponse::PassThrough,
    }
}

/// Resolves a request-relative template path, refusing anything that could
/// leave the template root.
fn template_path(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    if relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        Some(root.join(relative))
    } else {
        None
    }
}

fn render_file(site: &DevSite, path: &Path, overrides: PageOverrides) -> DevResponse {
    let template = match read_template(path) {
        Ok(template) => template,
        Err(TwinpressError::IOError { source, .. }) if source.kind() == ErrorKind::NotFound => {
            warn!("Template {} not found", path.display());
            return DevResponse::PassThrough;
        }
        Err(e) => {
            error!("{}", e);
            return DevResponse::RenderFailed(RenderResult::failed(e.to_string(), "").into_html());
        }
    };

    let navigation = site.navigation().current();
    let context = RenderContext::compose(site.base_context(), overrides, Mode::Serve, &navigation);
    match site.renderer().render(&template, &context) {
        RenderResult::Rendered(html) => {
            debug!("Rendered {}", path.display());
            DevResponse::Html(html)
        }
        RenderResult::Failed { message, diagnostic } => {
            error!("Failed to render {}: {}", path.display(), message);
            DevResponse::RenderFailed(diagnostic)
        }
    }
}

/// Middleware answering template routes and passing everything else on.
pub async fn render_templates(
    State(site): State<Arc<DevSite>>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET && request.method() != Method::HEAD {
        return next.run(request).await;
    }
    let response = respond(&site, request.uri().path());
    match response {
        DevResponse::PassThrough => next.run(request).await,
        response => response.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_index() {
        assert_eq!(classify("/", "html"), Route::Index);
        assert_eq!(classify("/index.html", "html"), Route::Index);
        assert_eq!(classify("/index.html?v=1", "html"), Route::Index);
    }

    #[test]
    fn test_classify_pages() {
        assert_eq!(classify("/pages/about", "html"), Route::Page("about".to_string()));
        assert_eq!(
            classify("/pages/about?x=1", "html"),
            Route::Page("about".to_string())
        );
        assert_eq!(
            classify("/pages/about.html", "html"),
            Route::Page("about.html".to_string())
        );
        assert_eq!(
            classify("/pages/%C3%A0-propos", "html"),
            Route::Page("à-propos".to_string())
        );
        assert_eq!(
            classify("/pages/about%20us/", "html"),
            Route::Page("about us".to_string())
        );
        assert_eq!(
            classify("/pages/../secret", "html"),
            Route::Page("../secret".to_string())
        );
    }

    #[test]
    fn test_classify_other_templates() {
        assert_eq!(
            classify("/components/card.html", "html"),
            Route::Template("components/card.html".to_string())
        );
        assert_eq!(
            classify("/my%20card.html", "html"),
            Route::Template("my card.html".to_string())
        );
        assert_eq!(classify("/assets/site.css", "html"), Route::Unmatched);
        assert_eq!(classify("/pagesabout", "html"), Route::Unmatched);
    }

    #[test]
    fn test_template_path_rejects_escapes() {
        let root = Path::new("views");
        assert_eq!(
            template_path(root, "a/b.html"),
            Some(PathBuf::from("views/a/b.html"))
        );
        assert_eq!(template_path(root, "../b.html"), None);
        assert_eq!(template_path(root, "a/../../b.html"), None);
    }
}
