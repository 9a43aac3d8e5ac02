use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use miqat::countdown;
use miqat::host::request_with_timeout;
use miqat::prelude::*;
use miqat::services::{FixedTimetable, Geocoder, Place};
use miqat::{ENGINE_NAME, VERSION as LIB_VERSION};
use rustyline::highlight::Highlighter;
use rustyline::Editor;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use std::borrow::Cow;
use std::collections::HashMap;
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A custom helper struct for rustyline that enables syntax highlighting.
#[derive(Completer, Helper, Hinter, Validator)]
struct MyHighlighter;

impl Highlighter for MyHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if let Some((command, rest)) = line.split_once(' ') {
            let colored_command = command.yellow().bold();
            let colored_rest = rest.yellow();
            Cow::Owned(format!("{} {}", colored_command, colored_rest))
        } else {
            Cow::Owned(line.yellow().bold().to_string())
        }
    }
    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    const LOGO_TEXT: &str = include_str!("../logo.log");
    println!("{}", LOGO_TEXT.cyan());

    let version_string = format!(
        "          Shell   v{:<8} Library   v{:<8}",
        SHELL_VERSION, LIB_VERSION
    );
    println!("{}", version_string.dimmed());
}

/// A geocoder over a small built-in gazetteer. The shell stays offline; a
/// real deployment would put a network client behind the same trait.
struct StaticGazetteer;

const GAZETTEER: &[(&str, f64, f64, &str, &str, &str)] = &[
    ("london", 51.5074, -0.1278, "London", "United Kingdom", "Europe/London"),
    ("istanbul", 41.0082, 28.9784, "Istanbul", "Turkey", "Europe/Istanbul"),
    ("karachi", 24.8607, 67.0011, "Karachi", "Pakistan", "Asia/Karachi"),
    ("jakarta", -6.2088, 106.8456, "Jakarta", "Indonesia", "Asia/Jakarta"),
    ("makkah", 21.4225, 39.8262, "Makkah", "Saudi Arabia", "Asia/Riyadh"),
];

impl Geocoder for StaticGazetteer {
    fn forward_geocode(&self, query: &str) -> Result<Place> {
        let needle = query.trim().to_ascii_lowercase();
        GAZETTEER
            .iter()
            .find(|(key, ..)| *key == needle)
            .map(|&(_, latitude, longitude, city, country, timezone)| Place {
                latitude,
                longitude,
                city: Some(city.to_string()),
                country: Some(country.to_string()),
                timezone: Some(timezone.to_string()),
            })
            .ok_or_else(|| anyhow::anyhow!("no results found for '{query}'"))
    }

    fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Result<Place> {
        GAZETTEER
            .iter()
            .min_by(|a, b| {
                let da = (a.1 - latitude).hypot(a.2 - longitude);
                let db = (b.1 - latitude).hypot(b.2 - longitude);
                da.total_cmp(&db)
            })
            .map(|&(_, lat, lon, city, country, timezone)| Place {
                latitude: lat,
                longitude: lon,
                city: Some(city.to_string()),
                country: Some(country.to_string()),
                timezone: Some(timezone.to_string()),
            })
            .ok_or_else(|| anyhow::anyhow!("gazetteer is empty"))
    }
}

/// Runs a geocoder lookup on a worker task, guarded by the shared
/// cross-context timeout.
async fn locate(geocoder: Arc<dyn Geocoder>, query: String) -> Result<Place> {
    let (tx, rx) = tokio::sync::oneshot::channel();
    tokio::task::spawn_blocking(move || {
        tx.send(geocoder.forward_geocode(&query)).ok();
    });
    request_with_timeout(rx).await?
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_target(false)
        .init();

    let config = match env::args().nth(1) {
        Some(path) => miqat::config::from_file(&path)?,
        None => MiqatConfig::default(),
    };
    let timezone = config.timezone;

    let engine = MiqatEngine::new(
        config,
        Arc::new(MemoryStore::new()),
        Arc::new(TokioScheduler::new()),
        Arc::new(FixedTimetable::standard(timezone)),
    );
    let engine_handle = engine.clone();
    let geocoder: Arc<dyn Geocoder> = Arc::new(StaticGazetteer);

    // Tick Listener (controlled by the shared flag).
    let is_listening_to_ticks = Arc::new(AtomicBool::new(false));
    let tick_flag = is_listening_to_ticks.clone();
    let mut tick_rx = engine.subscribe_tick_events();
    tokio::spawn(async move {
        while let Ok(event) = tick_rx.recv().await {
            if tick_flag.load(Ordering::Relaxed) {
                println!("<-- [RAW TICK] Tick #{} at {}", event.tick_count, event.at.format("%H:%M:%S"));
            }
        }
    });

    engine.refresh(Utc::now()).await?;

    info!("Spawning {} in the background...", ENGINE_NAME);
    tokio::spawn(async move {
        if let Err(e) = engine.run().await {
            eprintln!("\nEngine stopped with an error: {}", e);
        }
    });

    // The shell's state management variables.
    let mut active_listeners: HashMap<usize, ListenerId> = HashMap::new();
    let mut next_handle: usize = 0;

    let mut rl = Editor::new()?;
    let helper = MyHighlighter {};
    rl.set_helper(Some(helper));

    println!(
        "{} is running. Type 'help' for commands or 'exit' to quit.",
        ENGINE_NAME.cyan()
    );

    loop {
        let prompt = format!("{}", ">> ".cyan().bold());
        let readline = rl.readline(&prompt);
        match readline {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let args = line.trim().split_whitespace().collect::<Vec<_>>();

                if let Some(command) = args.first() {
                    match *command {
                        "status" => {
                            let config = engine_handle.config();
                            println!("Location : {}", config.location.label());
                            println!("Method   : {}", config.method.display_name());
                            println!("Timezone : {}", config.timezone);
                            match engine_handle.resolved_state(Utc::now()) {
                                ResolvedState::Resolved(resolution) => {
                                    match resolution.current {
                                        Some(current) => println!("Current  : {}", current),
                                        None => println!("Current  : (before first prayer)"),
                                    }
                                    println!(
                                        "Next     : {} at {}",
                                        resolution.next,
                                        resolution
                                            .next_at
                                            .with_timezone(&config.timezone)
                                            .format("%H:%M")
                                    );
                                }
                                ResolvedState::Unresolved => {
                                    println!("Current  : (no schedule)");
                                }
                            }
                        }
                        "badge" => {
                            let event = engine_handle.publish_badge(Utc::now()).await;
                            match event.badge {
                                Some(badge) if badge.urgent => {
                                    println!("--> [{}]", badge.label.red().bold())
                                }
                                Some(badge) => println!("--> [{}]", badge.label.green()),
                                None => println!("--> (cleared)"),
                            }
                        }
                        "next" => match engine_handle.resolved_state(Utc::now()) {
                            ResolvedState::Resolved(resolution) => {
                                let threshold =
                                    engine_handle.config().urgency_threshold_minutes;
                                let verbose =
                                    countdown::format(resolution.remaining, threshold, true);
                                println!(
                                    "--> Time until {}: {}",
                                    resolution.next, verbose.label
                                );
                            }
                            ResolvedState::Unresolved => {
                                println!("--> No upcoming prayer is resolvable.")
                            }
                        },
                        "refresh" => match engine_handle.refresh(Utc::now()).await {
                            Ok(()) => println!("--> Schedule recomputed and persisted."),
                            Err(e) => println!("Error: {}", e),
                        },
                        "align" => {
                            let now = Utc::now();
                            engine_handle.realign(now);
                            let phase = engine_handle.timer_phase(now);
                            println!(
                                "--> Alarm re-aligned: period {}s, anchor at epoch {}.",
                                phase.period_secs, phase.anchor_epoch_secs
                            );
                        }
                        "locate" => {
                            if args.len() < 2 {
                                println!("Usage: locate <PLACE>");
                            } else {
                                let query = args[1..].join(" ");
                                match locate(geocoder.clone(), query).await {
                                    Ok(place) => println!(
                                        "--> {} / {} ({:.4}, {:.4}) tz={}",
                                        place.city.unwrap_or_default(),
                                        place.country.unwrap_or_default(),
                                        place.latitude,
                                        place.longitude,
                                        place.timezone.unwrap_or_default()
                                    ),
                                    Err(e) => println!("Error: {}", e),
                                }
                            }
                        }
                        "watch" => {
                            let listener_id = engine_handle
                                .on_badge(|event| {
                                    if let Some(badge) = &event.badge {
                                        println!("<-- [WATCH] badge is now [{}]", badge.label);
                                    } else {
                                        println!("<-- [WATCH] badge cleared");
                                    }
                                })
                                .await;
                            let handle = next_handle;
                            active_listeners.insert(handle, listener_id);
                            next_handle += 1;
                            println!("--> Added badge watcher with handle: #{}", handle);
                        }
                        "unwatch" => {
                            if let Some(handle_str) = args.get(1) {
                                if let Ok(handle) = handle_str.parse::<usize>() {
                                    if let Some(id) = active_listeners.get(&handle).copied() {
                                        if engine_handle.remove_badge_listener(id).await {
                                            println!("--> Watcher successfully removed.");
                                        } else {
                                            println!("--> Error: watcher not found in engine.");
                                        }
                                        active_listeners.remove(&handle);
                                    } else {
                                        println!(
                                            "Error: Invalid handle #{}. Use 'list' to see active watchers.",
                                            handle
                                        );
                                    }
                                } else {
                                    println!("Error: Handle must be a number (e.g., '0', '1').");
                                }
                            } else {
                                println!("Usage: unwatch <HANDLE>");
                            }
                        }
                        "ticks" => match args.get(1) {
                            Some(&"on") => {
                                is_listening_to_ticks.store(true, Ordering::Relaxed);
                                println!("--> Started printing the raw tick stream.");
                            }
                            Some(&"off") => {
                                is_listening_to_ticks.store(false, Ordering::Relaxed);
                                println!("--> Stopped printing the raw tick stream.");
                            }
                            _ => println!("Usage: ticks <on|off>"),
                        },
                        "list" => {
                            println!("Active Watchers:");
                            for (handle, id) in &active_listeners {
                                println!("  Handle #{}: {:?}", handle, id);
                            }
                        }
                        "help" => {
                            println!("Available commands:");
                            println!("  status           - Shows location, method and resolved state.");
                            println!("  badge            - Publishes and prints the terse badge.");
                            println!("  next             - Prints the verbose countdown to the next prayer.");
                            println!("  refresh          - Recomputes and persists today's schedule.");
                            println!("  align            - Re-aligns the background alarm to the current phase.");
                            println!("  locate <PLACE>   - Resolves a place name via the geocoder.");
                            println!("  watch            - Adds a badge watcher printing every update.");
                            println!("  unwatch <H>      - Removes a watcher by its handle.");
                            println!("  ticks <on|off>   - Toggles printing of the raw tick stream.");
                            println!("  list             - Shows active watchers and their handles.");
                            println!("  exit             - Quits the shell.");
                        }
                        "exit" => break,
                        "" => {}
                        _ => println!("Unknown command: '{}'. Type 'help'.", line),
                    }
                }
            }
            Err(_) => {
                println!("Exiting miqat shell...");
                break;
            }
        }
    }

    Ok(())
}
