use arena_rating::{
    args::Args,
    config::RatingConfig,
    database::{db::DbClient, store::RatingStore},
    error::RatingError,
    model::{structures::rating_update::UpdateManyReport, updater::RatingUpdater},
    utils::progress_utils::progress_bar
};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let args = Args::parse();

    init_logging(&args.log_level);

    let mut client = match DbClient::connect(&args.connection_string).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            error!("Application cannot start without a valid database connection");
            std::process::exit(1);
        }
    };

    let arenas = match args.arena_id {
        Some(arena_id) => vec![arena_id],
        None => match client.arenas().await {
            Ok(arenas) => arenas,
            Err(e) => {
                error!("Failed to fetch arenas: {}", e);
                std::process::exit(1);
            }
        }
    };

    info!("Updating ratings in {} arenas", arenas.len());

    let mut updater = RatingUpdater::new(RatingConfig::from(&args));
    let mut reports = Vec::with_capacity(arenas.len());
    let mut failed = false;

    for arena_id in arenas {
        match drain_arena(&mut updater, &mut client, arena_id, &args).await {
            Ok(Some(report)) => reports.push(report),
            Ok(None) => {}
            Err(e) => {
                error!("Arena {} stopped: {}", arena_id, e);
                failed = true;
            }
        }
    }

    match serde_json::to_string_pretty(&reports) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to serialize reports: {}", e)
    }

    if failed {
        std::process::exit(1);
    }
}

/// Runs batches until the arena converges or the batch budget is spent, returning the
/// last batch's report.
async fn drain_arena(
    updater: &mut RatingUpdater,
    client: &mut DbClient,
    arena_id: i32,
    args: &Args
) -> Result<Option<UpdateManyReport>, RatingError> {
    let bar = progress_bar(args.max_batches as u64, format!("Arena {}", arena_id));
    let mut last = None;

    for _ in 0..args.max_batches {
        let report = updater.update_many(client, arena_id, args.batch_size).await?;

        if let Some(bar) = &bar {
            bar.inc(1);
            bar.set_message(format!("Arena {} (max error {:.3})", arena_id, report.max_rating_error));
        }

        let done = report.converged || report.updates < args.batch_size;
        last = Some(report);

        if done {
            break;
        }
    }

    if let Some(bar) = &bar {
        bar.finish_and_clear();
    }

    match &last {
        Some(report) if report.converged => info!("Arena {} converged", arena_id),
        Some(report) => warn!(
            "Arena {} did not converge within {} batches (max error {:.3})",
            arena_id, args.max_batches, report.max_rating_error
        ),
        None => {}
    }

    Ok(last)
}

fn init_logging(log_level: &str) {
    let indicatif_layer = IndicatifLayer::new();

    tracing_subscriber::registry()
        .with(EnvFilter::new(log_level))
        .with(fmt::layer().with_writer(indicatif_layer.get_stderr_writer()))
        .with(indicatif_layer)
        .init();
}
