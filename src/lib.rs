// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod cms;
pub mod config;
pub mod editor;
pub mod error;
pub mod herald;
pub mod ingest;
pub mod janitor;
pub mod ledger;
pub mod metrics;
pub mod orchestrator;
pub mod relevance;
pub mod scheduler;

use std::sync::Arc;

pub use crate::api::router;
pub use crate::config::HeraldConfig;
pub use crate::orchestrator::{Collaborators, CycleReport, Orchestrator};

use crate::cms::CmsStubClient;
use crate::editor::{gemini::GeminiClient, scoring::ModelScorer, EnabledChannels, Editor, TextModel};
use crate::herald::{linkedin::LinkedInPublisher, telegram::TelegramPublisher, x::XPublisher, Publisher};
use crate::ingest::enrich::HttpScraper;
use crate::ingest::providers::{
    announcements::AnnouncementsProvider, rss::RssProvider, submissions::SubmissionsProvider,
};
use crate::ingest::types::SourceProvider;
use crate::janitor::TempDirJanitor;
use crate::ledger::Ledger;
use crate::relevance::RelevanceGate;
use crate::scheduler::PublicationScheduler;

/// Wire the production collaborators from configuration.
pub fn build_orchestrator(cfg: &HeraldConfig) -> anyhow::Result<Orchestrator> {
    let model: Arc<dyn TextModel> = Arc::new(GeminiClient::new(
        cfg.gemini_api_key.clone(),
        cfg.gemini_model.clone(),
    )?);

    // Announcements come before feeds so their richer ids win title dedup.
    let mut sources: Vec<Box<dyn SourceProvider>> = Vec::new();
    if let Some(url) = &cfg.announcements_url {
        sources.push(Box::new(AnnouncementsProvider::from_url(url.clone())));
    }
    for feed in &cfg.rss_feeds {
        sources.push(Box::new(RssProvider::from_url(feed.clone())));
    }
    if let Some(dir) = &cfg.submissions_dir {
        sources.push(Box::new(SubmissionsProvider::new(dir.clone(), cfg.cms_url.clone())));
    }

    let mut publishers: Vec<Arc<dyn Publisher>> = Vec::new();
    if let Some(tg) = &cfg.telegram {
        publishers.push(Arc::new(TelegramPublisher::new(
            tg.bot_token.clone(),
            tg.channel_id.clone(),
        )));
    }
    if let Some(token) = &cfg.x_bearer_token {
        publishers.push(Arc::new(XPublisher::new(token.clone())));
    }
    if let Some(token) = &cfg.linkedin_access_token {
        publishers.push(Arc::new(LinkedInPublisher::new(token.clone())));
    }

    let channels = EnabledChannels {
        telegram: cfg.telegram_enabled(),
        x: cfg.x_enabled(),
        linkedin: cfg.linkedin_enabled(),
    };

    let collab = Collaborators {
        sources,
        enricher: Arc::new(HttpScraper::default()),
        gate: RelevanceGate::new(Arc::new(ModelScorer::new(model.clone()))),
        stubs: Arc::new(CmsStubClient::new(cfg.cms_url.clone(), cfg.cms_secret.clone())),
        generator: Arc::new(Editor::new(model, channels, cfg.cms_url.clone())),
        publishers,
        cleanups: vec![Arc::new(TempDirJanitor::new(cfg.temp_dir.clone()))],
    };

    let scheduler = Arc::new(PublicationScheduler::new(cfg.max_posts_per_day, cfg.delays));
    Ok(Orchestrator::new(
        Ledger::open(cfg.seen_file.clone()),
        scheduler,
        collab,
        cfg.check_interval,
    ))
}
