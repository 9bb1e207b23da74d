pub mod api;
pub mod cache;
pub mod calendar;
pub mod command;
pub mod config;
pub mod error;
pub mod feed;
pub mod llm;
pub mod news;
pub mod telemetry;
pub mod upstream;

use std::sync::Arc;
use cache::{Clock, SystemClock};
use command::CommandService;
use config::Config;
use llm::{OpenAiSummarizer, Summarizer};
use news::{MemorySummaryStore, NewsService};

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub clock: Arc<dyn Clock>,
    pub news: Arc<NewsService>,
    pub commands: Arc<CommandService>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build the state around an explicit time source; both TTL caches read from it.
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Self {
        let summarizer = config.openai_api_key.as_ref().map(|key| {
            Arc::new(OpenAiSummarizer::new(
                key.as_str(),
                config.openai_model.as_str(),
                config.upstreams.openai.as_str(),
            )) as Arc<dyn Summarizer>
        });

        let news = NewsService::new(
            config.news_feed_url.clone(),
            summarizer,
            Arc::new(MemorySummaryStore::default()),
            clock.clone(),
        );
        let commands = CommandService::load(&config.commands_path, clock.clone());

        AppState {
            config: Arc::new(config),
            clock,
            news: Arc::new(news),
            commands: Arc::new(commands),
        }
    }
}
