//! Run Command
//!
//! Process note files into lesson packs and optionally publish them.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;

use crate::ai::{OpenAiProvider, SharedProvider, StructuredGenerator};
use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::input;
use crate::pipeline::PipelineOrchestrator;
use crate::publish::{GoogleDocsClient, IdempotentPublisher};
use crate::types::{BriefError, Result};

pub struct RunOptions {
    /// Note files or directories to process
    pub inputs: Vec<PathBuf>,
    /// Extra course context prepended to every note
    pub context: Option<String>,
    /// Skip publishing even when the config enables it
    pub no_publish: bool,
    /// Model override
    pub model: Option<String>,
}

/// Returns true when every file succeeded
pub fn run(options: RunOptions) -> Result<bool> {
    let output = Output::new();
    let mut config = ConfigLoader::load()?;

    if let Some(model) = options.model {
        config.llm.model = model;
    }
    if options.no_publish {
        config.publish.enabled = false;
    }

    let mut files = input::collect_inputs(&options.inputs, &config.input)?;
    if let Some(context) = &options.context {
        for file in &mut files {
            file.content = format!("Course context: {}\n\n{}", context, file.content);
        }
    }
    output.info(&format!(
        "Processing {} note file(s) with {}",
        files.len(),
        config.llm.model
    ));

    let provider: SharedProvider = Arc::new(OpenAiProvider::new(&config.llm)?);
    let generator = StructuredGenerator::new(provider);

    let publisher = if config.publish.enabled {
        let client = GoogleDocsClient::new(&config.publish)?;
        Some(IdempotentPublisher::new(client, &config.publish))
    } else {
        None
    };

    let orchestrator = PipelineOrchestrator::new(generator, publisher, &config);

    let rt = Runtime::new().map_err(|e| BriefError::Pipeline {
        stage: "runtime",
        message: e.to_string(),
    })?;
    let outcomes = rt.block_on(orchestrator.process_batch(&files));

    output.batch_summary(&outcomes);
    Ok(outcomes.iter().all(|o| o.success))
}
