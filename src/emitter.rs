// Copyright © 2024 Twinpress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Build Emitter
//!
//! One sequential pass producing a self-contained static site:
//!
//! 1. ensure the output root exists;
//! 2. mirror the asset tree into `<output>/assets`, replacing any previous copy;
//! 3. render the index, strip development markup, write `index.html`;
//! 4. render every discovered page the same way, written as `<id>.<ext>`.
//!
//! Steps 2 to 4 fail per target. A failed target is recorded in the
//! [`BuildReport`] and the pass moves on to the next one. A page that failed to
//! render is not written, so a previous good copy stays in place.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use log::{error, info, warn};

use crate::content::{list_pages, Page};
use crate::context::{BaseContext, PageOverrides, RenderContext};
use crate::core::config::Config;
use crate::core::traits::{Generator, TemplateRenderer};
use crate::generators::html::{copy_assets, HtmlGenerator};
use crate::generators::OutputArtifact;
use crate::navigation::{build_navigation, NavigationEntry};
use crate::process::{markers_with, read_template, strip_dev_markup, DevMarker};
use crate::template::{HandlebarsRenderer, RenderResult};
use crate::urls::{Mode, BUILD_ASSETS_DIR, INDEX_DOCUMENT};
use crate::{Result, TwinpressError};

/// A target the build could not produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFailure {
    /// What failed: an output file name or `assets`.
    pub target: String,
    /// Why it failed.
    pub message: String,
}

/// Summary of one build pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Files written, in emission order.
    pub written: Vec<PathBuf>,
    /// Targets that failed.
    pub failures: Vec<BuildFailure>,
    /// Number of asset files copied, when the asset tree was copied.
    pub assets_copied: Option<usize>,
}

impl BuildReport {
    /// Whether every target was produced.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail<T: Into<String>, M: ToString>(&mut self, target: T, message: M) {
        let failure = BuildFailure {
            target: target.into(),
            message: message.to_string(),
        };
        error!("Failed to build {}: {}", failure.target, failure.message);
        self.failures.push(failure);
    }
}

/// Renders the whole site into the output directory.
#[derive(Debug)]
pub struct BuildEmitter {
    config: Config,
    base: BaseContext,
    markers: Vec<DevMarker>,
    renderer: Box<dyn TemplateRenderer>,
    generator: Box<dyn Generator>,
}

impl BuildEmitter {
    /// Creates an emitter with a build-mode Handlebars renderer and an HTML
    /// generator writing below `config.output_dir`.
    pub fn new(config: Config) -> Self {
        let renderer = HandlebarsRenderer::from_config(&config, Mode::Build);
        let generator = HtmlGenerator::new(&config.output_dir)
            .with_minification(config.output.minify);
        Self {
            base: config.base_context(),
            markers: markers_with(&config.output.dev_markers),
            renderer: Box::new(renderer),
            generator: Box::new(generator),
            config,
        }
    }

    /// Creates an emitter from explicit parts.
    ///
    /// # Errors
    ///
    /// Fails when `renderer` is not bound to build mode: its URL helpers would
    /// produce links that do not resolve in static output.
    pub fn with_parts(
        config: Config,
        renderer: Box<dyn TemplateRenderer>,
        generator: Box<dyn Generator>,
    ) -> Result<Self> {
        if renderer.render_config().mode() != Mode::Build {
            return Err(TwinpressError::internal_error(format!(
                "Build emitter needs a build-mode renderer, got {}",
                renderer.render_config().mode()
            )));
        }
        Ok(Self {
            base: config.base_context(),
            markers: markers_with(&config.output.dev_markers),
            renderer,
            generator,
            config,
        })
    }

    /// Runs the build pass.
    ///
    /// # Errors
    ///
    /// Only fails when the output root cannot be created; every other
    /// failure is recorded in the returned report.
    pub fn run(&self) -> Result<BuildReport> {
        let output_root = &self.config.output_dir;
        fs::create_dir_all(output_root)
            .map_err(|e| TwinpressError::io_error(output_root.clone(), e))?;
        info!("Building site into {}", output_root.display());

        let mut report = BuildReport::default();
        self.copy_asset_tree(&mut report);

        let pages = list_pages(
            &self.config.pages_path(),
            self.renderer.render_config().content_extension(),
        );
        let navigation = build_navigation(
            &pages,
            self.renderer.render_config(),
            &self.config.site.home_title,
        );

        self.emit_index(&navigation, &mut report);
        for page in &pages {
            self.emit_page(page, &navigation, &mut report);
        }

        info!(
            "Build finished: {} file(s) written, {} failure(s)",
            report.written.len(),
            report.failures.len()
        );
        Ok(report)
    }

    fn copy_asset_tree(&self, report: &mut BuildReport) {
        let source = &self.config.assets_dir;
        if !source.is_dir() {
            warn!(
                "Asset directory {} does not exist; building without assets",
                source.display()
            );
            return;
        }
        let dest = self.config.output_dir.join(BUILD_ASSETS_DIR);
        match copy_assets(source, &dest) {
            Ok(count) => {
                info!("Copied {} asset(s) to {}", count, dest.display());
                report.assets_copied = Some(count);
            }
            Err(e) => report.fail(BUILD_ASSETS_DIR, e),
        }
    }

    fn emit_index(&self, navigation: &[NavigationEntry], report: &mut BuildReport) {
        let index_path = self.config.index_path();
        let template = match read_template(&index_path) {
            Ok(template) => template,
            Err(TwinpressError::IOError { source, .. })
                if source.kind() == ErrorKind::NotFound =>
            {
                warn!(
                    "Index template {} not found; skipping {}",
                    index_path.display(),
                    INDEX_DOCUMENT
                );
                return;
            }
            Err(e) => return report.fail(INDEX_DOCUMENT, e),
        };
        let context = RenderContext::compose(
            &self.base,
            PageOverrides::default(),
            Mode::Build,
            navigation,
        );
        self.emit(INDEX_DOCUMENT.to_string(), &template, &context, report);
    }

    fn emit_page(
        &self,
        page: &Page,
        navigation: &[NavigationEntry],
        report: &mut BuildReport,
    ) {
        let target = self.renderer.render_config().page_file_name(&page.id);
        let template = match read_template(&page.source) {
            Ok(template) => template,
            Err(e) => return report.fail(target, e),
        };
        let context = RenderContext::compose(
            &self.base,
            PageOverrides::for_page(page, &self.base.site_title),
            Mode::Build,
            navigation,
        );
        self.emit(target, &template, &context, report);
    }

    fn emit(
        &self,
        target: String,
        template: &str,
        context: &RenderContext,
        report: &mut BuildReport,
    ) {
        let html = match self.renderer.render(template, context) {
            RenderResult::Rendered(html) => html,
            RenderResult::Failed { message, .. } => {
                return report.fail(target, message);
            }
        };
        let html = strip_dev_markup(&html, &self.markers);
        match self.generator.generate(&OutputArtifact::new(&target, html)) {
            Ok(path) => {
                info!("Wrote {}", path.display());
                report.written.push(path);
            }
            Err(e) => report.fail(target, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::urls::RenderConfig;
    use std::collections::BTreeMap;
    use std::path::Path;
    use tempfile::TempDir;

    const INDEX: &str = "<html>\n<head>\n<title>{{pageTitle}}</title>\n<link href=\"{{asset_url \"css/site.css\"}}\">\n<!-- Live reload client -->\n<script type=\"module\" src=\"/__twinpress/live-reload.js\"></script>\n</head>\n<body>\n{{#each navigation}}<a href=\"{{url}}\">{{title}}</a>{{/each}}\n</body>\n</html>\n";

    fn site(root: &Path) -> Config {
        let views = root.join("views");
        let pages = views.join("@pages");
        let assets = root.join("assets");
        fs::create_dir_all(&pages).unwrap();
        fs::create_dir_all(assets.join("css")).unwrap();
        fs::write(views.join("index.html"), INDEX).unwrap();
        fs::write(pages.join("about.html"), "<h1>{{pageTitle}}</h1>\n<!-- Remove this block when integrating the theme -->\n").unwrap();
        fs::write(pages.join("contact.html"), "<p>{{currentPage}}</p>").unwrap();
        fs::write(assets.join("css/site.css"), "body{}").unwrap();

        Config {
            template_dir: views,
            assets_dir: assets,
            output_dir: root.join("dist"),
            ..Config::default()
        }
    }

    #[test]
    fn test_build_writes_index_pages_and_assets() {
        let temp_dir = TempDir::new().unwrap();
        let config = site(temp_dir.path());
        let dist = config.output_dir.clone();

        let report = BuildEmitter::new(config).run().unwrap();

        assert!(report.is_success(), "{:?}", report.failures);
        assert_eq!(report.written.len(), 3);
        assert_eq!(report.assets_copied, Some(1));
        assert!(dist.join("assets/css/site.css").is_file());

        let index = fs::read_to_string(dist.join("index.html")).unwrap();
        assert!(index.contains("./assets/css/site.css"));
        assert!(index.contains("<a href=\"./index.html\">home</a>"));
        assert!(index.contains("<a href=\"./about.html\">About</a>"));
        assert!(!index.contains("live-reload"));
        assert!(!index.contains("Live reload client"));
        assert!(!index.contains("/pages/"));

        let about = fs::read_to_string(dist.join("about.html")).unwrap();
        assert_eq!(about, "<h1>About - Theme Default</h1>\n");
        let contact = fs::read_to_string(dist.join("contact.html")).unwrap();
        assert_eq!(contact, "<p>contact</p>");
    }

    #[test]
    fn test_stale_assets_are_removed() {
        let temp_dir = TempDir::new().unwrap();
        let config = site(temp_dir.path());
        let stale = config.output_dir.join("assets/old.js");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, "old").unwrap();

        let report = BuildEmitter::new(config).run().unwrap();

        assert!(report.is_success());
        assert!(!stale.exists());
    }

    #[test]
    fn test_build_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let config = site(temp_dir.path());
        let dist = config.output_dir.clone();
        let emitter = BuildEmitter::new(config);

        _ = emitter.run().unwrap();
        let first = snapshot(&dist);
        _ = emitter.run().unwrap();
        let second = snapshot(&dist);

        for expected in [
            "index.html",
            "about.html",
            "contact.html",
            "assets/css/site.css",
        ] {
            assert!(first.contains_key(Path::new(expected)), "{}", expected);
        }
        assert_eq!(first, second);
    }

    /// Every file below `root` with its bytes, keyed by relative path.
    fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        walkdir::WalkDir::new(root)
            .into_iter()
            .map(|entry| entry.unwrap())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| {
                let relative = entry.path().strip_prefix(root).unwrap().to_path_buf();
                (relative, fs::read(entry.path()).unwrap())
            })
            .collect()
    }

    #[test]
    fn test_page_failure_is_isolated() {
        let temp_dir = TempDir::new().unwrap();
        let config = site(temp_dir.path());
        fs::write(config.pages_path().join("broken.html"), "{{#each navigation}}")
            .unwrap();
        let dist = config.output_dir.clone();

        let report = BuildEmitter::new(config).run().unwrap();

        assert!(!report.is_success());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].target, "broken.html");
        assert!(!dist.join("broken.html").exists());
        assert!(dist.join("about.html").is_file());
        assert!(dist.join("contact.html").is_file());
        assert!(dist.join("index.html").is_file());
    }

    #[test]
    fn test_missing_assets_and_pages_degrade() {
        let temp_dir = TempDir::new().unwrap();
        let views = temp_dir.path().join("views");
        fs::create_dir_all(&views).unwrap();
        fs::write(views.join("index.html"), INDEX).unwrap();
        let config = Config {
            template_dir: views,
            assets_dir: temp_dir.path().join("missing-assets"),
            output_dir: temp_dir.path().join("dist"),
            ..Config::default()
        };

        let report = BuildEmitter::new(config).run().unwrap();

        assert!(report.is_success());
        assert_eq!(report.assets_copied, None);
        assert_eq!(report.written.len(), 1);
    }

    #[test]
    fn test_with_parts_rejects_serve_renderer() {
        let temp_dir = TempDir::new().unwrap();
        let config = site(temp_dir.path());
        let renderer = HandlebarsRenderer::new(
            &config.template_dir,
            RenderConfig::serve("html"),
        );
        let generator = HtmlGenerator::new(&config.output_dir);

        let result =
            BuildEmitter::with_parts(config, Box::new(renderer), Box::new(generator));
        assert!(result.is_err());
    }
}
