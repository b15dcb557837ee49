use clap::Parser;
use tokio::sync::watch;
use tokio::task::JoinSet;
use warehouse_ingest::domain::ports::FileHandler;
use warehouse_ingest::utils::{logger, validation::Validate};
use warehouse_ingest::{
    CliConfig, Domain, DomainHandler, HttpWarehouseClient, IngestConfig, IngestPipeline,
    LocalFileStore, PipelineDirs, PipelineSummary,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 解析並驗證配置；這是唯一會讓程式結束的錯誤
    let config = match cli.resolve().and_then(|config| config.validate().map(|_| config)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    // 初始化日誌
    logger::init_logger(&config.log_level, config.log_format, cli.verbose);

    tracing::info!("🚀 Starting file watcher database auto-updater");
    log_config(&config);

    let client = HttpWarehouseClient::new(
        config.warehouse_article_endpoint.clone(),
        config.warehouse_product_endpoint.clone(),
        config.request_timeout(),
    )?;

    for domain in Domain::ALL {
        if let Err(e) = client.health_check(domain).await {
            tracing::warn!(
                "⚠️ Warehouse API for {} is not healthy yet ({}). Files will fail until it is",
                domain,
                e
            );
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut pipelines = JoinSet::new();

    let article_handler = DomainHandler::article(client.clone(), LocalFileStore::new())
        .with_settle_delay(config.settle_delay());
    spawn_pipeline(
        &mut pipelines,
        Domain::Article,
        config.dirs_for(Domain::Article),
        article_handler,
        &config,
        shutdown_rx.clone(),
    )
    .await;

    let product_handler = DomainHandler::product(client, LocalFileStore::new())
        .with_settle_delay(config.settle_delay());
    spawn_pipeline(
        &mut pipelines,
        Domain::Product,
        config.dirs_for(Domain::Product),
        product_handler,
        &config,
        shutdown_rx,
    )
    .await;

    tracing::info!("✅ Initialization completed");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested, finishing files in progress");
    let _ = shutdown_tx.send(true);

    while let Some(joined) = pipelines.join_next().await {
        match joined {
            Ok((domain, summary)) => tracing::info!("📊 {} pipeline: {:?}", domain, summary),
            Err(e) => tracing::error!("❌ Pipeline task failed: {}", e),
        }
    }

    Ok(())
}

async fn spawn_pipeline<H: FileHandler>(
    pipelines: &mut JoinSet<(Domain, PipelineSummary)>,
    domain: Domain,
    dirs: PipelineDirs,
    handler: H,
    config: &IngestConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let runner = IngestPipeline::new(domain, dirs, handler)
        .with_max_concurrent_handlers(config.max_concurrent_handlers)
        .start()
        .await;

    pipelines.spawn(async move {
        let summary = runner
            .run_until(async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            })
            .await;
        (domain, summary)
    });
    tracing::info!("Started data ingestion pipeline for {}", domain);
}

fn log_config(config: &IngestConfig) {
    tracing::info!("logLevel = {}", config.log_level);
    tracing::info!("incomingDataFolder = {}", config.incoming_data_folder);
    tracing::info!("successProcessedFolder = {}", config.success_processed_folder);
    tracing::info!("failProcessedFolder = {}", config.fail_processed_folder);
    tracing::info!("warehouseArticleEndpoint = {}", config.warehouse_article_endpoint);
    tracing::info!("warehouseProductEndpoint = {}", config.warehouse_product_endpoint);
    match config.max_concurrent_handlers {
        Some(limit) => tracing::info!("maxConcurrentHandlers = {}", limit),
        None => tracing::info!("maxConcurrentHandlers = unbounded"),
    }
}
