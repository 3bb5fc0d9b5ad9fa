use anyhow::{Context, Result};
use reachout::cli::{
    AppConfig, Args, ConfigDiscovery, EvaluateConfig, ExecutionMode, GenerateConfig,
    GlobalOptions, OutreachConfig,
};
use reachout::env;
use reachout::llm::{BestOfNEvaluator, GenerationDispatcher, SlidingWindowLimiter};
use reachout::outreach::{
    DryRunScheduler, EvaluatedEmailComposer, JsonRecordStore, NoopSearchExecutor,
    OutreachPipeline, PipelineParts, PipelineSettings, RecordStore, TemplateQueryGenerator,
    stagger_minutes,
};
use reachout::Credentials;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_filter = if args.verbose {
        "reachout=debug"
    } else {
        env::DEFAULT_LOG_FILTER
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let mode = match args.mode() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match mode {
        ExecutionMode::Generate(config) => run_generate(config).await,
        ExecutionMode::Evaluate(config) => run_evaluate(config).await,
        ExecutionMode::Outreach(config) => run_outreach(config).await,
        ExecutionMode::ShowConfig => {
            ConfigDiscovery::show_discovery_info();
            Ok(())
        }
    }
}

fn load_config(global: &GlobalOptions) -> Result<AppConfig> {
    ConfigDiscovery::load(global.config_override.as_deref()).context("loading configuration")
}

fn load_credentials(global: &GlobalOptions, config: &AppConfig) -> Result<Credentials> {
    let path = global
        .credentials_override
        .clone()
        .or_else(|| config.resolved_credentials_path());

    let credentials = match path {
        Some(path) => Credentials::from_json_file(&path)?,
        None => {
            info!("No credentials file configured, reading provider keys from environment");
            Credentials::from_env()?
        }
    };
    Ok(credentials)
}

fn build_dispatcher(
    global: &GlobalOptions,
    config: &AppConfig,
) -> Result<Arc<GenerationDispatcher>> {
    let credentials = load_credentials(global, config)?;
    let limiter = Arc::new(SlidingWindowLimiter::new(config.rate_limit_config()));
    let dispatcher =
        GenerationDispatcher::from_credentials(&credentials, limiter, config.provider_setups())?;
    Ok(Arc::new(dispatcher))
}

async fn run_generate(config: GenerateConfig) -> Result<()> {
    let provider = config.provider_kind()?;
    let app_config = load_config(&config.global)?;
    let dispatcher = build_dispatcher(&config.global, &app_config)?;

    let text = dispatcher.generate(&config.prompt, provider).await?;
    println!("{}", text);
    Ok(())
}

async fn run_evaluate(config: EvaluateConfig) -> Result<()> {
    let provider = config.provider_kind()?;
    let app_config = load_config(&config.global)?;
    let dispatcher = build_dispatcher(&config.global, &app_config)?;
    let evaluator = BestOfNEvaluator::new(dispatcher, app_config.evaluation_config());

    let best = evaluator
        .generate_and_evaluate(&config.prompt, &config.criteria, provider)
        .await?;
    println!("{}", best);
    Ok(())
}

async fn run_outreach(config: OutreachConfig) -> Result<()> {
    let app_config = load_config(&config.global)?;
    let outreach = &app_config.outreach;
    let store = Arc::new(JsonRecordStore::new(&config.records));

    if config.dry_run {
        let pending = store.load_pending().await?;
        println!("🔍 Dry run: {} pending record(s)", pending.len());
        for (index, record) in pending.iter().enumerate() {
            let at = outreach
                .schedule
                .scheduled_time(stagger_minutes(index + 1))?;
            println!(
                "  {}. {} <{}> at {}",
                index + 1,
                record.identifier,
                record.contact,
                at.to_rfc3339()
            );
        }
        return Ok(());
    }

    if outreach.student_info.trim().is_empty() {
        warn!("outreach.student_info is empty; emails will carry no sender details");
    }

    let dispatcher = build_dispatcher(&config.global, &app_config)?;
    let evaluator = Arc::new(BestOfNEvaluator::new(
        dispatcher,
        app_config.evaluation_config(),
    ));

    let parts = PipelineParts {
        store,
        queries: Arc::new(TemplateQueryGenerator::new(
            outreach.query_templates.clone(),
        )),
        search: Arc::new(NoopSearchExecutor),
        composer: Arc::new(EvaluatedEmailComposer::new(
            evaluator,
            outreach.templates.clone(),
        )),
        scheduler: Arc::new(DryRunScheduler::new()),
    };
    let settings = PipelineSettings {
        student_info: outreach.student_info.clone(),
        provider: outreach.provider,
        attachment_path: outreach.attachment_path.clone(),
        schedule: outreach.schedule.clone(),
    };

    let report = OutreachPipeline::new(parts, settings).run().await?;

    println!(
        "✅ {} record(s) processed, {} failed",
        report.processed.len(),
        report.failed.len()
    );
    for failure in &report.failed {
        println!(
            "  ❌ {} ({}): {}",
            failure.identifier, failure.stage, failure.error
        );
    }
    if !report.is_clean() {
        std::process::exit(2);
    }
    Ok(())
}
