use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{ArgAction, Parser, Subcommand};
use env_logger::Env;
use log::{debug, error, info, warn};
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc;

mod backend;
mod engine;
mod env;
mod events;
mod install;
mod networking;
mod news;
mod notifications;
mod session;
mod settings;
mod storage;
mod updater;
mod util;

use backend::LocalBackend;
use engine::LauncherContext;
use engine::error::CoordinatorError;
use engine::state::{StatusMessage, UpdateSession};
use events::{BackendEvent, EventIngestor, EventPayload, EventSink};
use storage::StorageManager;

#[derive(Parser, Debug)]
#[command(
    name = "ShineCore Launcher",
    author,
    version,
    about = "Update and session orchestration for the ShineCore game launcher"
)]
struct Cli {
    /// App directory holding launcher.json and profile.json.
    #[arg(long, env = env::HOME_OVERRIDE_VAR)]
    home: Option<PathBuf>,

    /// Debug logging.
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the startup sequence and print the resulting state.
    Status,
    /// Probe whether the launcher is offline.
    CheckNetwork {
        #[arg(long)]
        force: bool,
        #[arg(long, default_value = "manual")]
        reason: String,
    },
    /// Ask whether a game or launcher update is pending.
    CheckUpdates {
        #[arg(long)]
        force: bool,
    },
    /// Show the logged-in account and its profiles.
    Account,
    /// Select the active profile.
    SelectProfile { uuid: String },
    Logout,
    /// List the release channels available to this user.
    Channels,
    SetChannel { name: String },
    /// Apply pending updates and follow progress until they finish.
    Apply {
        /// Request cancellation after this many status events.
        #[arg(long)]
        cancel_after: Option<usize>,
    },
    /// Fetch news articles, optionally opening one in the browser.
    News {
        /// 1-based index of the article to open.
        #[arg(long = "open")]
        open_index: Option<usize>,
    },
    /// Show launcher settings, or change one of them.
    Settings {
        #[command(subcommand)]
        change: Option<SettingsChange>,
    },
    /// Feed newline-delimited JSON events through the ingestor and print the final state.
    Replay { file: PathBuf },
}

#[derive(Subcommand, Debug)]
enum SettingsChange {
    /// Game heap size in MB, clamped to what this machine can offer.
    Memory { mb: u32 },
    /// Show the game console window on launch.
    Console {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },
    InstallDir { path: String },
}

fn main() {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    let runtime = build_runtime();
    if let Err(err) = runtime.block_on(run(cli)) {
        error!("{err}");
        std::process::exit(1);
    }
}

fn build_runtime() -> Runtime {
    match Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(err) => {
            warn!(
                "main: failed to create multithreaded runtime ({}); trying single-threaded runtime",
                err
            );
            match Builder::new_current_thread().enable_all().build() {
                Ok(rt) => rt,
                Err(fallback_err) => {
                    error!(
                        "main: failed to create any Tokio runtime ({}); terminating launcher",
                        fallback_err
                    );
                    std::process::exit(1);
                }
            }
        }
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let storage = match cli.home {
        Some(home) => StorageManager::with_base_dir(home),
        None => StorageManager::new(),
    };
    info!("main: using app directory {}", storage.base_dir().display());
    let config = storage.load_config().await?;

    let (sink, rx) = EventSink::channel();
    let backend = Arc::new(LocalBackend::new(storage, sink));
    let ctx = LauncherContext::new(backend, config.update_codes);
    let mut ingestor = ctx.ingestor(rx);

    match cli.command {
        Command::Status => {
            ctx.bootstrap().await;
            print_status(&ctx);
        }
        Command::CheckNetwork { force, reason } => {
            ctx.network.check_network_mode(force, &reason).await;
            let cache = ctx.network.snapshot();
            println!("network: {}", if cache.is_offline { "offline" } else { "online" });
        }
        Command::CheckUpdates { force } => {
            if ctx.updates.check_for_launcher_update().await {
                println!("launcher: a newer launcher build must be installed first");
            }
            let availability = ctx.updates.check_for_updates(force).await.map_err(describe)?;
            match availability {
                Some(update) => println!(
                    "updates: {:?} available{}",
                    update.primary_action,
                    update
                        .game_version
                        .map(|v| format!(" ({v})"))
                        .unwrap_or_default()
                ),
                None => println!("updates: up to date"),
            }
        }
        Command::Account => {
            ctx.accounts.check_session_info().await;
            print_account(&ctx);
        }
        Command::SelectProfile { uuid } => {
            ctx.accounts.load().await;
            ctx.accounts.set_user_profile(&uuid).await.map_err(describe)?;
            print_account(&ctx);
        }
        Command::Logout => {
            ctx.accounts.logout().await.map_err(describe)?;
            println!("account: logged out");
        }
        Command::Channels => {
            ctx.install.fetch_install_info().await;
            let install = ctx.install.snapshot();
            for channel in &install.allowed_channels {
                let marker = if *channel == install.current_channel { "*" } else { " " };
                println!("{marker} {channel}");
            }
        }
        Command::SetChannel { name } => {
            ctx.install.set_channel(&name).await.map_err(describe)?;
            println!("channel: {}", ctx.install.snapshot().current_channel);
        }
        Command::Apply { cancel_after } => {
            ctx.updates.apply_updates().await.map_err(describe)?;
            follow_update(&ctx, ingestor, cancel_after).await;
        }
        Command::News { open_index } => {
            ctx.news.refresh().await;
            wait_for_feed(&mut ingestor).await;
            let articles = ctx.news.articles();
            for (idx, article) in articles.iter().enumerate() {
                println!("[{}] {}", idx + 1, article.title);
                if !article.description.is_empty() {
                    println!("    {}", article.description);
                }
            }
            if let Some(target) = open_index.and_then(|n| n.checked_sub(1)).and_then(|i| articles.get(i))
                && let Some(url) = &target.dest_url
                && let Err(err) = open::that(url)
            {
                warn!("news: failed to open {url}: {err}");
            }
        }
        Command::Settings { change } => {
            match change {
                Some(SettingsChange::Memory { mb }) => {
                    ctx.settings.set_memory_mb(mb).await.map_err(describe)?;
                }
                Some(SettingsChange::Console { enabled }) => {
                    ctx.settings.set_console_enabled(enabled).await.map_err(describe)?;
                }
                Some(SettingsChange::InstallDir { path }) => {
                    ctx.settings.set_install_dir(&path).await.map_err(describe)?;
                }
                None => {}
            }
            ctx.settings.fetch_settings().await;
            print_settings(&ctx);
        }
        Command::Replay { file } => {
            let body = tokio::fs::read_to_string(&file)
                .await
                .map_err(|err| format!("failed to read {}: {err}", file.display()))?;
            let (tx, replay_rx) = mpsc::unbounded_channel();
            for (line_no, line) in body.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match BackendEvent::from_json(line) {
                    Ok(event) => tx.send(event).map_err(|err| format!("replay: {err}"))?,
                    Err(err) => warn!("replay: line {}: {err}", line_no + 1),
                }
            }
            drop(tx);
            let applied = ctx.ingestor(replay_rx).drain();
            println!("replay: {applied} event(s) changed state");
            print_session(&ctx.updates.session());
            println!("news: {} article(s)", ctx.news.articles().len());
        }
    }
    Ok(())
}

fn describe(err: CoordinatorError) -> String {
    if err.is_precondition() {
        format!("not possible right now: {err}")
    } else {
        err.to_string()
    }
}

async fn follow_update(ctx: &LauncherContext, ingestor: EventIngestor, cancel_after: Option<usize>) {
    let mut session_rx = ctx.updates.subscribe_session();
    let ingest = tokio::spawn(ingestor.run());
    let mut progress_updates = 0;
    while session_rx.changed().await.is_ok() {
        let session = session_rx.borrow_and_update().clone();
        debug!("apply: {} {:?}", session.status.id(), session.status.params());
        print_session(&session);
        if !session.is_running {
            report_outcome(ctx, &session.status);
            break;
        }
        if session.is_cancelling {
            continue;
        }
        progress_updates += 1;
        if cancel_after == Some(progress_updates)
            && let Err(err) = ctx.updates.cancel_updates().await
        {
            warn!("apply: {}", describe(err));
        }
    }
    ingest.abort();
    print_toasts(ctx);
}

fn report_outcome(ctx: &LauncherContext, status: &StatusMessage) {
    match status {
        StatusMessage::Completed => {
            ctx.notifications.show_success("Update completed");
        }
        StatusMessage::Cancelled => {
            ctx.notifications.show_info("Update cancelled");
        }
        StatusMessage::Failed { reason } => {
            ctx.notifications.show_error(format!("Update failed: {reason}"));
        }
        _ => {}
    }
}

async fn wait_for_feed(ingestor: &mut EventIngestor) {
    let timeout = std::time::Duration::from_secs(30);
    let result = tokio::time::timeout(timeout, async {
        while let Some(event) = ingestor.next().await {
            if matches!(event.payload, EventPayload::FeedUpdated { .. }) {
                return;
            }
        }
    })
    .await;
    if result.is_err() {
        warn!("news: no feed received within {}s", timeout.as_secs());
    }
}

fn print_status(ctx: &LauncherContext) {
    let network = ctx.network.snapshot();
    println!(
        "network:  {}",
        if network.is_offline { "offline" } else { "online" }
    );
    print_account(ctx);
    let install = ctx.install.snapshot();
    println!("channel:  {}", install.current_channel);
    println!(
        "game:     {}",
        install.game_version.as_deref().unwrap_or("not installed")
    );
    if let Some(lkg) = &install.last_known_good_version {
        println!("lkg:      {lkg}");
    }
    match ctx.updates.availability() {
        Some(update) => println!("updates:  {:?} available", update.primary_action),
        None => println!("updates:  none"),
    }
    print_settings(ctx);
    ctx.notifications.prune_expired(Instant::now());
    print_toasts(ctx);
}

/// Print each pending toast once, then dismiss it.
fn print_toasts(ctx: &LauncherContext) {
    for toast in ctx.notifications.visible() {
        println!("! [{:?}] {}", toast.kind, toast.message);
        ctx.notifications.remove(toast.id);
    }
}

fn print_settings(ctx: &LauncherContext) {
    let settings = ctx.settings.snapshot();
    if let Some(memory) = settings.memory {
        println!(
            "memory:   {} MB (allowed {}-{} MB)",
            memory.current_mb, memory.min_mb, memory.max_mb
        );
    }
    println!("console:  {}", if settings.console_enabled { "on" } else { "off" });
    if let Some(dir) = &settings.install_dir {
        println!("install:  {dir}");
    }
}

fn print_account(ctx: &LauncherContext) {
    let session = ctx.accounts.snapshot();
    if !session.is_logged_in() {
        println!("account:  not logged in");
        return;
    }
    let current = session.current_profile().map(|p| p.uuid.clone());
    for profile in &session.profiles {
        let marker = if current.as_deref() == Some(profile.uuid.as_str()) { "*" } else { " " };
        println!("{marker} {} ({})", profile.username, profile.uuid);
    }
}

fn print_session(session: &UpdateSession) {
    let mut line = format!(
        "[{:>3.0}%] {}",
        session.progress * 100.0,
        session.status.english()
    );
    if let Some(download) = &session.download {
        line.push_str(&format!(" ({})", util::format_speed(download.bytes_per_second)));
    }
    if let Some(cancellation) = &session.cancellation_status {
        line.push_str(&format!(" | {}", cancellation.english()));
    }
    println!("{line}");
}
