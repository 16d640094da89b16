use clap::Parser;
use serde_json::json;
use tripsheet_core::{
    ItineraryItem, LocationPatch, OwnerId, SheetSource, SnapshotKind, SnapshotStore, StoreConfig,
    SyncConfig, TripSync,
};
use tripsheet_server::backends::{build_engine, build_store};
use tripsheet_server::cli::{CacheKind, Cli, Commands, ItineraryAction, SourceArgs};

fn sheet_source(args: &SourceArgs) -> tripsheet_core::Result<SheetSource> {
    SheetSource::new(args.owner.as_str(), args.spreadsheet_id.as_str())
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tripsheet_core::o11y::init_tracing_from_env()?;
    let cli = Cli::parse();
    let config = SyncConfig::from_env()?;
    let store_cfg = StoreConfig::from_env()?;

    match cli.command {
        Commands::Sync { source } => {
            let source = sheet_source(&source)?;
            let engine = build_engine(config, &store_cfg).await?;
            let report = engine.sync_locations(&source).await?;
            print_json(&report)?;
        }
        Commands::Itinerary { source, action } => {
            let source = sheet_source(&source)?;
            let engine = build_engine(config, &store_cfg).await?;
            let items = match action {
                ItineraryAction::Read => engine.read_itinerary(&source).await?,
                ItineraryAction::Write { file } => {
                    let raw = tokio::fs::read_to_string(&file).await?;
                    let items: Vec<ItineraryItem> = serde_json::from_str(&raw)?;
                    engine.write_itinerary(&source, items).await?
                }
            };
            print_json(&items)?;
        }
        Commands::UpdateLocation { source, id, patch } => {
            let source = sheet_source(&source)?;
            let patch: LocationPatch = serde_json::from_str(&patch)?;
            let engine = build_engine(config, &store_cfg).await?;
            let record = engine.update_location(&source, &id, patch).await?;
            print_json(&record)?;
        }
        Commands::ShowCache { owner, kind } => {
            let owner = OwnerId::new(owner)?;
            let store = build_store(&store_cfg).await?;
            let snapshot_kind = match kind {
                CacheKind::Locations => SnapshotKind::Locations,
                CacheKind::Itinerary => SnapshotKind::Itinerary,
            };
            let snapshot = store.get(snapshot_kind, &owner).await?;
            match snapshot {
                Some(s) => print_json(&s)?,
                None => tracing::info!(owner = %owner, ?kind, "no cached snapshot"),
            }
        }
        Commands::Config => {
            print_json(&json!({
                "locations_tab": config.locations_tab,
                "itinerary_tab": config.itinerary_tab,
                "enrich_max_items": config.enrich_max_items,
                "execution_ceiling_ms": config.execution_ceiling.as_millis() as u64,
                "enrich_budget_ms": config.enrich_budget().as_millis() as u64,
                "id_strategy": config.id_strategy,
                "price": config.price,
                "owner_locks": config.owner_locks,
                "cache_db": store_cfg.cache_db,
                "google_sheets_access_token": redacted("GOOGLE_SHEETS_ACCESS_TOKEN"),
                "google_places_api_key": redacted("GOOGLE_PLACES_API_KEY"),
            }))?;
        }
    }
    Ok(())
}

fn redacted(key: &str) -> &'static str {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => "***",
        _ => "<unset>",
    }
}
