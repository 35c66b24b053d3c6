use anyhow::Result;
use clap::{Parser, Subcommand};
use dayline_auth::{GoogleAuth, TokenStorage};
use dayline_calendar::{
    AuthSessionManager, CalendarClient, EventCache, JsonFileStore, LoadOutcome,
    ScrollPositionStore, SessionError, TimelineLayout,
};
use dayline_core::{AppError, Config};

mod terminal;

use terminal::TerminalSink;

type Session = AuthSessionManager<GoogleAuth, CalendarClient, JsonFileStore, TerminalSink>;

#[derive(Parser)]
#[command(name = "dayline", version, about = "Today's Google Calendar events on a timeline")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Show today's events, from the cache when possible (default)
    Show {
        /// Hide events ending above this offset and remember it for next time
        #[arg(long)]
        scroll_to: Option<f64>,
    },
    /// Sign in with Google in the browser, then show today's events
    SignIn,
    /// Revoke the Google token and clear cached events
    SignOut,
    /// Discard cached events and fetch them again
    Refresh,
}

#[tokio::main]
async fn main() -> Result<()> {
    dayline_core::init()?;

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Show { scroll_to: None });

    if let Err(e) = run(command).await {
        tracing::debug!("Command failed: {:?}", e);
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }

    Ok(())
}

async fn run(command: Command) -> Result<(), AppError> {
    let (config, _) = Config::load_validated()?;
    tracing::info!("Config directory: {}", config.config_dir.display());

    let scroll = ScrollPositionStore::new(JsonFileStore::new(config.config_dir.join("local.json")));
    let scroll_offset = match &command {
        Command::Show {
            scroll_to: Some(offset),
        } => {
            scroll.save(*offset)?;
            *offset
        }
        _ => scroll.load()?.unwrap_or(0.0),
    };

    let layout = TimelineLayout {
        start_hour: config.calendar.start_hour,
        scale: config.calendar.scale,
    };

    let identity = GoogleAuth::new(
        config.google.client_id.clone(),
        config.google.client_secret.clone(),
        config.google.callback_port,
        config.google.revoke_url.clone(),
        TokenStorage::new(config.token_dir()),
    );
    let cache = EventCache::new(
        JsonFileStore::new(config.config_dir.join("event_cache.json")),
        config.cache.expire_at_midnight,
    );

    let session: Session = AuthSessionManager::new(
        identity,
        CalendarClient::new(&config.calendar.api_base_url),
        cache,
        TerminalSink::new(layout, scroll_offset),
        dayline_calendar::LocalClock,
        layout,
    );

    execute(&session, &config, command).await
}

async fn execute(session: &Session, config: &Config, command: Command) -> Result<(), AppError> {
    match command {
        Command::Show { .. } => report(session.start().await?),
        Command::SignIn => {
            config.google.require_configured()?;
            report(session.interactive_sign_in().await?)
        }
        Command::SignOut => {
            if let Err(e) = session.silent_check().await {
                tracing::warn!("Could not load the current token: {}", e);
            }
            session.sign_out().await?;
            println!("Signed out.");
        }
        Command::Refresh => {
            if session.silent_check().await?.is_none() {
                return Err(SessionError::NotSignedIn.into());
            }
            report(session.refresh().await?);
        }
    }

    Ok(())
}

fn report(outcome: LoadOutcome) {
    match outcome {
        LoadOutcome::SignedOut => println!("Not signed in. Run `dayline sign-in` first."),
        LoadOutcome::Cached { events } => {
            tracing::debug!("Showed {} cached events", events.len())
        }
        LoadOutcome::Fetched { events } => {
            tracing::debug!("Showed {} fetched events", events.len())
        }
        LoadOutcome::Discarded => tracing::debug!("Load discarded after sign-out"),
    }
}
