//! imagine-client - 批量图像推理客户端
//!
//! 收集输入条目，一次性解析提示词，按顺序派发到推理服务，
//! 把生成的图像和 output.json 写入输出目录。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use imagine::application::{BatchRunner, GenerationDefaults, ProgressSink};
use imagine::config::{load_config_from_path, AppConfig};
use imagine::domain::batch::Item;
use imagine::domain::generation::{parse_extra, GenerationParams};
use imagine::domain::prompt::{resolve, PromptSpec};
use imagine::infrastructure::adapters::{
    write_manifest, FileImageStorage, HttpModelClient, HttpModelClientConfig,
};
use imagine::infrastructure::cli::{collect_items, IndicatifProgress};
use imagine::logging::init_tracing;

#[derive(Parser, Debug)]
#[command(
    name = "imagine-client",
    version,
    about = "Run a batch of image generations against a model server"
)]
struct Args {
    /// Configuration file (TOML / YAML / JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Literal prompt, or a .txt / .json / .yaml prompt file
    #[arg(short, long)]
    prompt: Option<String>,

    /// Input image: a file, a directory of .png/.jpg/.jpeg, or a glob pattern
    #[arg(short, long)]
    image: Option<String>,

    /// Output directory for images and output.json
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Full inference endpoint URL (overrides model.url + model name)
    #[arg(long)]
    endpoint: Option<String>,

    /// Model name
    #[arg(short, long)]
    model: Option<String>,

    #[arg(long)]
    seed: Option<i64>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    #[arg(long)]
    guidance_scale: Option<f64>,

    #[arg(long = "steps")]
    num_inference_steps: Option<u32>,

    #[arg(long)]
    negative_prompt: Option<String>,

    /// Images per request (only the first is kept per item)
    #[arg(long)]
    batch: Option<u32>,

    /// Extra request field, KEY=VALUE (VALUE parsed as JSON when possible)
    #[arg(long = "param", value_parser = parse_extra)]
    params: Vec<(String, Value)>,

    /// Seconds to wait for each item before giving up
    #[arg(long)]
    wait_budget: Option<u64>,

    /// Expected seconds per item, used for estimated progress
    #[arg(long)]
    estimated_wait: Option<f64>,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,
}

impl Args {
    fn generation_params(&self, config: &AppConfig) -> GenerationParams {
        let mut params = GenerationParams {
            seed: self.seed,
            width: self.width,
            height: self.height,
            guidance_scale: self.guidance_scale,
            num_inference_steps: self.num_inference_steps,
            negative_prompt: self.negative_prompt.clone(),
            batch: self.batch,
            extras: self.params.iter().cloned().collect(),
        };

        GenerationDefaults {
            width: config.generation.width,
            height: config.generation.height,
            guidance_scale: config.generation.guidance_scale,
            num_inference_steps: config.generation.num_inference_steps,
            max_batch: config.model.max_batch,
        }
        .apply(&mut params);

        params
    }

    fn prompt_spec(&self, config: &AppConfig) -> anyhow::Result<PromptSpec> {
        match (&self.prompt, &config.client.prompt) {
            (Some(raw), _) => Ok(PromptSpec::from_arg(raw)),
            (None, Some(value)) => Ok(PromptSpec::from_json(value)?),
            (None, None) => anyhow::bail!("No prompt given: pass --prompt or set client.prompt"),
        }
    }

    fn wait_budget(&self, config: &AppConfig) -> Duration {
        self.wait_budget
            .or(config.client.wait_budget_secs)
            .map(Duration::from_secs)
            .unwrap_or_else(|| config.model.wait_budget())
    }

    fn estimated_wait(&self, config: &AppConfig) -> Option<Duration> {
        match self.estimated_wait {
            Some(secs) if secs.is_finite() && secs > 0.0 => Some(Duration::from_secs_f64(secs)),
            Some(_) => None,
            None => config.model.estimated_wait(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = load_config_from_path(args.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config.log, &[]);

    // 条目收集与提示词解析都在任何派发之前完成
    let mut items: Vec<Item> = match &args.image {
        Some(input) => collect_items(input)?,
        None => Vec::new(),
    };
    let spec = args.prompt_spec(&config)?;
    let mapping = resolve(&spec, &items)?;
    if items.is_empty() {
        items = mapping.prompt_only_items();
    }

    let params = args.generation_params(&config);
    let wait_budget = args.wait_budget(&config);
    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| config.client.output_dir.clone());

    let model = args.model.clone().unwrap_or_else(|| config.model.name.clone());
    let model_config = HttpModelClientConfig::new(&config.model.url, &model)
        .with_endpoint(args.endpoint.clone().or_else(|| config.model.endpoint.clone()))
        .with_timeout(config.model.timeout_secs)
        .with_verify_tls(config.model.verify_tls);
    let engine = Arc::new(HttpModelClient::new(model_config)?);
    let storage = Arc::new(
        FileImageStorage::new(&output_dir)
            .await
            .with_context(|| format!("Failed to prepare output directory {}", output_dir.display()))?,
    );

    let progress = Arc::new(if args.no_progress {
        IndicatifProgress::hidden()
    } else {
        IndicatifProgress::new(items.len())
    });

    let cancel = CancellationToken::new();
    let runner = BatchRunner::new(engine, storage)
        .with_progress(progress.clone() as Arc<dyn ProgressSink>)
        .with_estimated_wait(args.estimated_wait(&config))
        .with_cancellation(cancel.clone());

    // Ctrl-C：在途条目记为 interrupted，清单照常写出
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Received interrupt, stopping after the current item");
            signal_token.cancel();
        }
    });

    tracing::info!(
        items = items.len(),
        model = %model,
        output_dir = %output_dir.display(),
        "Starting batch"
    );

    let manifest = runner.run(&items, &mapping, &params, wait_budget).await;
    progress.finish();

    let manifest_path = write_manifest(&output_dir, &manifest)
        .await
        .context("Failed to write manifest")?;

    println!(
        "{} succeeded, {} failed{} -> {}",
        manifest.succeeded_count(),
        manifest.failed_count(),
        if manifest.is_interrupted() { " (interrupted)" } else { "" },
        manifest_path.display()
    );

    if manifest.is_interrupted() {
        std::process::exit(130);
    }

    Ok(())
}
