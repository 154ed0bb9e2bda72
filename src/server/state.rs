// Copyright © 2024 Twinpress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared state of the development server.

use tokio::sync::broadcast;

use crate::content::list_pages;
use crate::context::BaseContext;
use crate::core::config::Config;
use crate::core::traits::TemplateRenderer;
use crate::navigation::{build_navigation, NavigationSnapshot};
use crate::server::live_reload::ReloadEvent;
use crate::template::HandlebarsRenderer;
use crate::urls::Mode;

/// Capacity of the reload broadcast channel.
const RELOAD_CHANNEL_CAPACITY: usize = 16;

/// Everything a request needs: configuration, the serve-mode renderer, the
/// base context and the current navigation.
///
/// The navigation snapshot is the only value that changes while the server
/// runs; [`DevSite::refresh_navigation`] is its single write path.
#[derive(Debug)]
pub struct DevSite {
    config: Config,
    base: BaseContext,
    renderer: Box<dyn TemplateRenderer>,
    navigation: NavigationSnapshot,
    reload: broadcast::Sender<ReloadEvent>,
}

impl DevSite {
    /// Creates the site state with a serve-mode Handlebars renderer.
    pub fn new(config: Config) -> Self {
        let renderer = HandlebarsRenderer::from_config(&config, Mode::Serve);
        Self::with_renderer(config, Box::new(renderer))
    }

    /// Creates the site state around `renderer`, computing the initial
    /// navigation from the pages on disk.
    pub fn with_renderer(config: Config, renderer: Box<dyn TemplateRenderer>) -> Self {
        let (reload, _) = broadcast::channel(RELOAD_CHANNEL_CAPACITY);
        let site = Self {
            base: config.base_context(),
            navigation: NavigationSnapshot::new(Vec::new()),
            renderer,
            reload,
            config,
        };
        site.refresh_navigation();
        site
    }

    /// Site configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process-wide base context.
    pub fn base_context(&self) -> &BaseContext {
        &self.base
    }

    /// The serve-mode renderer.
    pub fn renderer(&self) -> &dyn TemplateRenderer {
        self.renderer.as_ref()
    }

    /// Current navigation snapshot.
    pub fn navigation(&self) -> &NavigationSnapshot {
        &self.navigation
    }

    /// Re-reads the pages directory and swaps in a fresh navigation list.
    pub fn refresh_navigation(&self) {
        let render_config = self.renderer.render_config();
        let pages = list_pages(
            &self.config.pages_path(),
            render_config.content_extension(),
        );
        self.navigation.replace(build_navigation(
            &pages,
            render_config,
            &self.config.site.home_title,
        ));
    }

    /// Subscribes to reload events.
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.reload.subscribe()
    }

    /// Sends `event` to every connected client, returning how many received it.
    pub fn broadcast(&self, event: ReloadEvent) -> usize {
        self.reload.send(event).unwrap_or(0)
    }
}
