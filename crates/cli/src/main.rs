//! `bulkgen` — submit bulk prompt batches to the generation gateway
//! and follow them to settlement.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bulkgen_client::GatewayApi;
use bulkgen_core::csv_import::extract_prompts;
use bulkgen_core::fanout::{ElementRef, FanOutMode, GenerationSettings, ReferenceMode};
use bulkgen_core::prompt::{PromptContext, VariantTag};
use bulkgen_core::submission::SubmissionRequest;
use bulkgen_pipeline::{BatchEvent, BatchOrchestrator};

use config::GatewayConfig;

#[derive(Parser, Debug)]
#[command(name = "bulkgen", about = "Bulk image-generation batch runner")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a batch from a prompt file and follow it to settlement.
    Run {
        /// File with one prompt per line (`[N]? text (--neg text)?`),
        /// or CSV with a `prompt` column.
        prompts: PathBuf,

        /// Treat the prompt file as CSV regardless of extension.
        #[arg(long)]
        csv: bool,

        /// Model id to generate with.
        #[arg(long)]
        model: String,

        /// Reference image file; repeat for multiple images.
        #[arg(long = "image")]
        images: Vec<PathBuf>,

        /// Fan-out mode: combined, cycle, or all.
        #[arg(long, default_value = "combined")]
        mode: String,

        /// Global negative prompt for lines without a `--neg` override.
        #[arg(long, default_value = "")]
        negative: String,

        /// "More creative / less like reference" slider in [0, 1].
        #[arg(long, default_value_t = 0.5)]
        creativity: f64,

        /// Reference mode: character, style, content, or basic.
        #[arg(long, default_value = "character")]
        reference_mode: String,

        #[arg(long, default_value_t = 1024)]
        width: u32,

        #[arg(long, default_value_t = 1024)]
        height: u32,

        /// Images generated per item.
        #[arg(long, default_value_t = 1)]
        num_images: u32,

        /// Element (LoRA) id applied to every item.
        #[arg(long)]
        element: Option<String>,

        /// Element weight.
        #[arg(long, default_value_t = 0.8)]
        element_weight: f64,

        /// Trigger word prepended when an element is configured.
        #[arg(long, default_value = "")]
        trigger: String,

        /// Important-variant label appended to every prompt.
        #[arg(long)]
        variant_label: Option<String>,

        /// Important-variant slug recorded after the `imp=` marker.
        #[arg(long)]
        variant_slug: Option<String>,

        #[arg(long)]
        guidance_scale: Option<u32>,

        #[arg(long)]
        steps: Option<u32>,

        #[arg(long)]
        scheduler: Option<String>,

        #[arg(long)]
        alchemy: bool,

        #[arg(long)]
        enhance_prompt: bool,

        #[arg(long)]
        preset_style: Option<String>,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// List the provider model catalog.
    Models,

    /// Show account identity and remaining credits.
    Whoami,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bulkgen=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = GatewayConfig::from_env();
    let api = Arc::new(GatewayApi::new(&config.gateway_url, &config.api_key));

    match args.command {
        Command::Models => {
            let models = api.list_models().await?;
            for model in models {
                println!(
                    "{}  {}  {}",
                    model.id,
                    model.name,
                    model.description.unwrap_or_default(),
                );
            }
        }
        Command::Whoami => {
            let user = api.user_info().await?;
            println!("{} ({})", user.username, user.id);
            println!("tokens: {}", user.subscription_tokens);
            println!("model tokens: {}", user.subscription_model_tokens);
        }
        Command::Run {
            prompts,
            csv,
            model,
            images,
            mode,
            negative,
            creativity,
            reference_mode,
            width,
            height,
            num_images,
            element,
            element_weight,
            trigger,
            variant_label,
            variant_slug,
            guidance_scale,
            steps,
            scheduler,
            alchemy,
            enhance_prompt,
            preset_style,
            seed,
        } => {
            let raw = std::fs::read_to_string(&prompts)
                .with_context(|| format!("reading prompt file {}", prompts.display()))?;

            let is_csv =
                csv || prompts.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            let bulk_text = if is_csv {
                extract_prompts(&raw).join("\n")
            } else {
                raw
            };

            let fan_out_mode: FanOutMode = mode.parse()?;
            let reference_mode = parse_reference_mode(&reference_mode)?;

            let element = element.map(|id| ElementRef {
                id,
                weight: element_weight,
            });
            let important_variant = match (variant_label, variant_slug) {
                (Some(label), Some(slug)) => Some(VariantTag { label, slug }),
                (None, None) => None,
                _ => anyhow::bail!("--variant-label and --variant-slug must be given together"),
            };

            let request = SubmissionRequest {
                bulk_text,
                context: PromptContext {
                    global_negative: negative,
                    trigger_word: trigger,
                    element_configured: element.is_some(),
                    important_variant,
                },
                settings: GenerationSettings {
                    model_id: model,
                    width,
                    height,
                    num_images,
                    init_strength: creativity,
                    reference_mode,
                    element,
                    guidance_scale,
                    num_inference_steps: steps,
                    scheduler,
                    alchemy: alchemy.then_some(true),
                    enhance_prompt: enhance_prompt.then_some(true),
                    preset_style,
                    seed,
                },
                reference_images: images,
                fan_out_mode,
            };

            run_batch(api, config, request).await?;
        }
    }

    Ok(())
}

/// Submit the batch and stream progress events until it settles,
/// degrades, or the user interrupts.
async fn run_batch(
    api: Arc<GatewayApi>,
    config: GatewayConfig,
    request: SubmissionRequest,
) -> anyhow::Result<()> {
    let orchestrator =
        BatchOrchestrator::new(Arc::clone(&api)).with_poll_interval(config.poll_interval);
    let mut events = orchestrator.subscribe();

    let batch = orchestrator.submit(&request).await?;
    println!("batch {} submitted ({} items)", batch.batch_id, batch.item_count);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                batch.poller.stop();
                println!("interrupted, polling stopped");
                return Ok(());
            }
            event = events.recv() => match event {
                Ok(BatchEvent::Progress { snapshot, .. }) => {
                    println!(
                        "progress: {}/{} completed, {} failed, {} processing",
                        snapshot.completed, snapshot.total, snapshot.failed, snapshot.processing,
                    );
                }
                Ok(BatchEvent::Settled { snapshot, .. }) => {
                    println!(
                        "settled: {} completed, {} failed of {}",
                        snapshot.completed, snapshot.failed, snapshot.total,
                    );
                    // Settlement is the hook for refreshing credit counters.
                    match api.user_info().await {
                        Ok(user) => println!("tokens remaining: {}", user.subscription_tokens),
                        Err(e) => tracing::warn!(error = %e, "Could not refresh credit counters"),
                    }
                    return Ok(());
                }
                Ok(BatchEvent::Degraded { error, last_snapshot, .. }) => {
                    if let Some(snapshot) = last_snapshot {
                        println!(
                            "degraded after {}/{} completed: {error}",
                            snapshot.completed, snapshot.total,
                        );
                    } else {
                        println!("degraded before first status response: {error}");
                    }
                    anyhow::bail!("polling degraded: {error}");
                }
                Err(e) => anyhow::bail!("event stream closed: {e}"),
            }
        }
    }
}

fn parse_reference_mode(s: &str) -> anyhow::Result<ReferenceMode> {
    match s.to_ascii_lowercase().as_str() {
        "character" => Ok(ReferenceMode::Character),
        "style" => Ok(ReferenceMode::Style),
        "content" => Ok(ReferenceMode::Content),
        "basic" => Ok(ReferenceMode::Basic),
        other => anyhow::bail!(
            "unknown reference mode '{other}' (expected character, style, content, or basic)"
        ),
    }
}
