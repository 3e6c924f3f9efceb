use std::sync::Arc;

use spirit_enrich::config::AppConfig;
use spirit_enrich::core::consent::{ConsentCategory, ConsentStatus, ConsentStore};
use spirit_enrich::core::credentials::{self, SecretStore};
use spirit_enrich::core::jobs::{EnrichmentJob, EnrichmentScheduler, RetryPolicy};
use spirit_enrich::core::llm::{CombinedProvider, ProviderConfig, ProviderMode, ProviderSettings};
use spirit_enrich::core::logging;
use spirit_enrich::core::profile::{Profile, ProfileStore};
use spirit_enrich::database::Database;

const USAGE: &str = "\
usage: spirit-enrich [--quiet] <command>

commands:
  enrich <profile-id>                 run an enrichment job and print the outcome
  consent <category> <status>         set consent (ai_enrichment|cloud_sync|analytics, granted|denied|unknown)
  mode <mode>                         set provider mode (auto|prefer-remote|prefer-local|remote-only|local-only)
  list [query]                        list profiles, optionally filtered by name
  profile new <name>                  create an empty profile and print its id
  profile set <id> <field> <value>    set a profile field (blank value clears it)
  key set <api-key>                   store the hosted provider API key
  key clear                           remove the stored hosted provider API key";

enum Command {
    Enrich(String),
    Consent(ConsentCategory, ConsentStatus),
    Mode(ProviderMode),
    List(Option<String>),
    NewProfile(String),
    SetField { id: String, field: String, value: String },
    SetKey(String),
    ClearKey,
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let words: Vec<&str> = args.iter().map(String::as_str).collect();
    match words.as_slice() {
        ["enrich", id] => Ok(Command::Enrich(id.to_string())),
        ["consent", category, status] => Ok(Command::Consent(
            category.parse().map_err(|e| format!("{e}"))?,
            status.parse().map_err(|e| format!("{e}"))?,
        )),
        ["mode", mode] => Ok(Command::Mode(mode.parse().map_err(|e| format!("{e}"))?)),
        ["list"] => Ok(Command::List(None)),
        ["list", query] => Ok(Command::List(Some(query.to_string()))),
        ["profile", "new", name @ ..] if !name.is_empty() => Ok(Command::NewProfile(name.join(" "))),
        ["profile", "set", id, field, value @ ..] => Ok(Command::SetField {
            id: id.to_string(),
            field: field.to_string(),
            value: value.join(" "),
        }),
        ["key", "set", key] => {
            if credentials::validate_api_key(key) {
                Ok(Command::SetKey(key.to_string()))
            } else {
                Err("API key looks malformed".to_string())
            }
        }
        ["key", "clear"] => Ok(Command::ClearKey),
        _ => Err(USAGE.to_string()),
    }
}

#[tokio::main]
async fn main() {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let quiet = match args.iter().position(|a| a == "--quiet" || a == "-q") {
        Some(index) => {
            args.remove(index);
            true
        }
        None => false,
    };

    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(2);
        }
    };

    let (config, config_source) = AppConfig::load();
    let data_dir = config.data_dir();

    let _log_guard = if quiet {
        logging::init_stdout_only();
        None
    } else {
        Some(logging::init(&data_dir))
    };
    config_source.log();
    tracing::info!("spirit-enrich v{} starting", spirit_enrich::VERSION);

    match run(command, config).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Returns Ok(false) when the command ran but did not succeed
async fn run(command: Command, config: AppConfig) -> Result<bool, Box<dyn std::error::Error>> {
    let key_name = config.providers.hosted.credential_key.clone();
    match &command {
        Command::SetKey(key) => {
            credentials::default_store().store_secret(&key_name, key)?;
            println!("hosted API key stored: {}", credentials::mask_api_key(key));
            return Ok(true);
        }
        Command::ClearKey => {
            credentials::default_store().delete_secret(&key_name)?;
            println!("hosted API key removed");
            return Ok(true);
        }
        _ => {}
    }

    let db = Arc::new(Database::new(&config.data_dir()).await?);

    match command {
        Command::Enrich(profile_id) => {
            let secrets: Arc<dyn SecretStore> = Arc::from(credentials::default_store());
            let hosted = ProviderConfig::Hosted(config.providers.hosted.clone()).create_provider(secrets.clone())?;
            let local = ProviderConfig::Local(config.providers.local.clone()).create_provider(secrets)?;

            let combined = CombinedProvider::new(hosted, local, db.clone())
                .with_default_mode(config.providers.default_mode)
                .with_auto_primary(config.providers.auto_primary);

            let job = EnrichmentJob::new(db.clone(), db.clone(), Arc::new(combined));
            let scheduler = EnrichmentScheduler::new(job, RetryPolicy::from(&config.jobs));

            let ticket = scheduler.enqueue(&profile_id);
            let outcome = tokio::select! {
                outcome = ticket.wait() => outcome,
                _ = tokio::signal::ctrl_c() => {
                    scheduler.cancel(&profile_id);
                    scheduler.shutdown().await;
                    match scheduler.last_outcome(&profile_id) {
                        Some(outcome) => outcome,
                        None => return Ok(false),
                    }
                }
            };

            println!("{outcome}");
            if outcome.needs_attention {
                println!("Check provider settings: mode, API key, or local host.");
            }
            if outcome.is_success() {
                if let Some(profile) = db.get(&profile_id).await? {
                    if let Some(enrichment) = profile.enrichment {
                        println!("\n{}", enrichment.narrative);
                    }
                }
            }
            db.close().await;
            Ok(outcome.is_success())
        }
        Command::Consent(category, status) => {
            db.set_status(category, status).await?;
            println!("{category}: {status}");
            Ok(true)
        }
        Command::Mode(mode) => {
            db.set_provider_mode(mode).await?;
            println!("provider mode: {mode}");
            Ok(true)
        }
        Command::List(query) => {
            let profiles = db.search(query.as_deref().unwrap_or("")).await?;
            if profiles.is_empty() {
                println!("No profiles.");
            }
            for profile in profiles {
                let enriched = if profile.enrichment.is_some() { "enriched" } else { "-" };
                println!(
                    "{}  {:<24} {:>3}%  {:<13} {}",
                    profile.id,
                    profile.profile_name,
                    profile.completion.percentage(),
                    profile.completion.tier.as_str(),
                    enriched
                );
            }
            Ok(true)
        }
        Command::NewProfile(name) => {
            let profile = db.save(&Profile::new(name)).await?;
            println!("{}", profile.id);
            Ok(true)
        }
        Command::SetField { id, field, value } => {
            let Some(mut profile) = db.get(&id).await? else {
                eprintln!("No profile with id {id}");
                return Ok(false);
            };
            let mut edit = Ok(());
            profile.edit(|fields| edit = fields.set_from_str(&field, &value));
            edit?;

            let profile = db.save(&profile).await?;
            println!(
                "{}: {}/{} fields, tier {}",
                profile.id,
                profile.completion.filled_field_count,
                profile.completion.total_field_count,
                profile.completion.tier.as_str()
            );
            Ok(true)
        }
        // Handled before the database is opened
        Command::SetKey(_) | Command::ClearKey => Ok(true),
    }
}
