use anyhow::{Context, Result};

pub mod feed;
pub mod pipeline;

pub use feed::*;
pub use pipeline::*;

#[derive(Debug, Clone, Default)]
pub struct MonitorConfig {
    pub feed: FeedConfig,
    pub pipeline: PipelineConfig,
}

impl MonitorConfig {
    pub fn load_from_files(feed_path: &str, pipeline_path: &str) -> Result<Self> {
        let feed_content = std::fs::read_to_string(feed_path)
            .with_context(|| format!("reading feed configuration {}", feed_path))?;
        let pipeline_content = std::fs::read_to_string(pipeline_path)
            .with_context(|| format!("reading pipeline configuration {}", pipeline_path))?;

        let feed: FeedConfig = toml::from_str(&feed_content)?;
        let pipeline: PipelineConfig = toml::from_str(&pipeline_content)?;

        // Validate configurations
        feed.validate()?;
        pipeline.validate()?;

        Ok(MonitorConfig { feed, pipeline })
    }
}

pub trait Validate {
    fn validate(&self) -> Result<()>;
}
