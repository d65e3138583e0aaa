// SPDX-License-Identifier: GPL-3.0-or-later

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use rewindle_catalog::CatalogClient;
use rewindle_config::{load as load_config, AppConfig};
use rewindle_domain::{GenrePreset, GENRES};
use rewindle_game::{
    GameSession, Leaderboard, RestLeaderboard, SelectionOptions, SongSelector,
};
use rewindle_preview::PreviewClient;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = load_config(config_path.as_deref())?;
    init_tracing(&config.telemetry.log_level);
    info!(target: "cli", "starting rewindle");

    let catalog = Arc::new(build_catalog(&config)?);
    let previews = Arc::new(PreviewClient::new_with_limits(
        config.preview.base_url.clone(),
        Duration::from_millis(config.preview.timeout_ms),
        config.preview.result_limit,
    ));
    let selector = Arc::new(SongSelector::new(
        Arc::clone(&catalog) as Arc<dyn rewindle_game::TrackSource>,
        Arc::clone(&previews) as Arc<dyn rewindle_game::PreviewSource>,
        SelectionOptions::from(&config.selection),
    ));
    let leaderboard = build_leaderboard(&config);

    println!("=== Rewindle: guess the release year ===\n");
    let player = prompt_nonempty("Player name: ")?;
    let genre = prompt_genre()?;
    let (start_year, end_year) = prompt_year_range(genre)?;

    let session = Arc::new(Mutex::new(GameSession::new(
        player,
        start_year,
        end_year,
        genre.name,
        config.scoring.mode,
        config.scoring.max_guess_time,
    )));

    run_game(&session, &selector, &catalog, config.scoring.max_guess_time).await?;

    let entry = session.lock().await.finish();
    if let Some(entry) = entry {
        println!(
            "\nGame over. {} scored {} across {} songs.",
            entry.player, entry.total_score, entry.songs_played
        );
        leaderboard.save(&entry).await;
    } else {
        println!("\nGame over. No rounds played.");
    }

    print_leaderboard(&leaderboard).await;
    Ok(())
}

async fn run_game(
    session: &Arc<Mutex<GameSession>>,
    selector: &Arc<SongSelector>,
    catalog: &Arc<CatalogClient>,
    max_guess_time: u32,
) -> Result<()> {
    loop {
        let Some(song) = next_song(session, selector).await else {
            let played = session.lock().await.played_ids().len();
            println!("{}", exhaustion_message(played));
            if !change_filters(session, catalog).await? {
                return Ok(());
            }
            continue;
        };

        let round = {
            let mut session = session.lock().await;
            session.begin_round(song.clone());
            session.round()
        };
        spawn_prefetch(session, selector);

        println!("\n--- Round {} ---", round);
        println!("Preview clip: {}", song.preview_url);
        println!("You have {} seconds.", max_guess_time);

        let started = Instant::now();
        let guess = prompt_guess()?;
        let elapsed = started.elapsed().as_secs() as u32;
        let timed_out = elapsed > max_guess_time;
        if timed_out {
            println!("Too slow! Scoring at the {} second limit.", max_guess_time);
        }

        let Some(guess) = guess else {
            return Ok(());
        };

        {
            let mut session = session.lock().await;
            if let Some(result) = session.record_guess(guess, elapsed, timed_out) {
                println!("\nIt was: {} ({})", result.song_label, result.actual);
                println!("Listen in full: {}", song.external_url);
                println!("Round score: {}", result.score);
            }
            println!(
                "Total after {} songs: {}",
                session.songs_played(),
                session.total_score()
            );
        }

        match prompt_choice("\n[n]ext song, [c]hange filters, [q]uit: ", &["n", "c", "q"])?.as_str()
        {
            "n" => {}
            "c" => {
                if !change_filters(session, catalog).await? {
                    return Ok(());
                }
            }
            _ => return Ok(()),
        }
    }
}

/// Uses the prefetched song when it is still valid, otherwise selects fresh.
async fn next_song(
    session: &Arc<Mutex<GameSession>>,
    selector: &Arc<SongSelector>,
) -> Option<rewindle_domain::PlayableSong> {
    let (prefetched, start, end, genre, played_ids, played_keys) = {
        let mut session = session.lock().await;
        (
            session.take_prefetched(),
            session.start_year,
            session.end_year,
            session.genre.clone(),
            session.played_ids().clone(),
            session.played_keys().clone(),
        )
    };
    if let Some(song) = prefetched {
        debug!(target: "cli", id = %song.id, "using prefetched song");
        return Some(song);
    }

    let genre_query = genre_query_for(&genre);
    selector
        .select_song(start, end, &played_ids, &played_keys, genre_query)
        .await
}

/// Starts a background selection so the next round has no fetch latency.
/// The result is validated against the played sets at promotion time.
fn spawn_prefetch(session: &Arc<Mutex<GameSession>>, selector: &Arc<SongSelector>) {
    let session = Arc::clone(session);
    let selector = Arc::clone(selector);
    tokio::spawn(async move {
        let (start, end, genre, played_ids, played_keys) = {
            let session = session.lock().await;
            (
                session.start_year,
                session.end_year,
                session.genre.clone(),
                session.played_ids().clone(),
                session.played_keys().clone(),
            )
        };
        let genre_query = genre_query_for(&genre).to_string();
        if let Some(song) = selector
            .select_song(start, end, &played_ids, &played_keys, &genre_query)
            .await
        {
            session.lock().await.store_prefetched(song);
        }
    });
}

/// Re-prompts for genre and year range. Returns false when the player quits
/// instead.
async fn change_filters(
    session: &Arc<Mutex<GameSession>>,
    catalog: &Arc<CatalogClient>,
) -> Result<bool> {
    println!();
    let genre = prompt_genre()?;
    let (start_year, end_year) = prompt_year_range(genre)?;

    catalog.clear_caches().await;
    session
        .lock()
        .await
        .change_filters(start_year, end_year, genre.name);
    Ok(true)
}

/// Selection coming up empty means different things depending on whether
/// anything was played: a full range with everything consumed, or a range
/// that produced nothing to begin with.
fn exhaustion_message(songs_played: usize) -> String {
    if songs_played > 0 {
        format!(
            "You've played {} songs! Try expanding the year range.",
            songs_played
        )
    } else {
        "Could not find a song. Try a different range or genre!".to_string()
    }
}

fn genre_query_for(genre_name: &str) -> &'static str {
    rewindle_domain::find_genre(genre_name)
        .map(|preset| preset.query)
        .unwrap_or("")
}

fn build_catalog(config: &AppConfig) -> Result<CatalogClient> {
    let mut builder = CatalogClient::builder()
        .market(config.catalog.market.clone())
        .min_popularity(config.catalog.min_popularity)
        .track_cache_ttl(Duration::from_secs(config.catalog.track_cache_ttl_secs))
        .timeout(Duration::from_secs(config.catalog.timeout_secs));

    match (&config.catalog.client_id, &config.catalog.client_secret) {
        (Some(id), Some(secret)) => builder = builder.credentials(id, secret),
        _ => warn!(target: "cli", "no catalog credentials configured, songs will not load"),
    }
    if let Some(url) = &config.catalog.base_url {
        builder = builder.base_url(url);
    }
    if let Some(url) = &config.catalog.auth_url {
        builder = builder.auth_url(url);
    }

    Ok(builder.build()?)
}

fn build_leaderboard(config: &AppConfig) -> Leaderboard {
    let remote = match (&config.leaderboard.url, &config.leaderboard.api_key) {
        (Some(url), Some(key)) => Some(RestLeaderboard::new(url, key)),
        _ => {
            debug!(target: "cli", "no leaderboard endpoint configured, scores stay local");
            None
        }
    };
    Leaderboard::new(remote, config.leaderboard.max_entries)
}

async fn print_leaderboard(leaderboard: &Leaderboard) {
    let entries = leaderboard.top_entries().await;
    if entries.is_empty() {
        return;
    }

    println!("\n=== Leaderboard ===");
    println!(
        "{:<4} {:<16} {:>8} {:>6} {:>6}  {:<12} {}",
        "#", "Player", "Score", "Songs", "Avg", "Genre", "Date"
    );
    for (rank, entry) in entries.iter().enumerate() {
        println!(
            "{:<4} {:<16} {:>8} {:>6} {:>6}  {:<12} {}",
            rank + 1,
            entry.player,
            entry.total_score,
            entry.songs_played,
            entry.avg_score,
            entry.genre,
            entry.date
        );
    }
}

fn init_tracing(default_level: &str) {
    let fmt_layer = fmt::layer().with_target(true).with_level(true);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn prompt_genre() -> Result<&'static GenrePreset> {
    println!("Genres:");
    for (index, preset) in GENRES.iter().enumerate() {
        println!(
            "  {:>2}. {} ({}-{})",
            index + 1,
            preset.name,
            preset.start_year,
            preset.end_year
        );
    }

    loop {
        let input = read_line("Pick a genre [1]: ")?;
        let input = input.trim();
        if input.is_empty() {
            return Ok(&GENRES[0]);
        }
        if let Ok(index) = input.parse::<usize>() {
            if (1..=GENRES.len()).contains(&index) {
                return Ok(&GENRES[index - 1]);
            }
        }
        if let Some(preset) = rewindle_domain::find_genre(input) {
            return Ok(preset);
        }
        println!("Not a genre. Enter a number or a name from the list.");
    }
}

fn prompt_year_range(genre: &GenrePreset) -> Result<(i32, i32)> {
    let start = prompt_year(
        &format!("Start year [{}]: ", genre.start_year),
        genre.start_year,
    )?;
    loop {
        let end = prompt_year(&format!("End year [{}]: ", genre.end_year), genre.end_year)?;
        if end >= start {
            return Ok((start, end));
        }
        println!("End year must not precede {}.", start);
    }
}

fn prompt_year(prompt: &str, default: i32) -> Result<i32> {
    loop {
        let input = read_line(prompt)?;
        let input = input.trim();
        if input.is_empty() {
            return Ok(default);
        }
        match input.parse::<i32>() {
            Ok(year) if (1900..=2100).contains(&year) => return Ok(year),
            _ => println!("Enter a four-digit year."),
        }
    }
}

/// Reads a year guess; `None` means the player quit mid-round.
fn prompt_guess() -> Result<Option<i32>> {
    loop {
        let input = read_line("Your guess (year, or q to quit): ")?;
        let input = input.trim();
        if input.eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        match input.parse::<i32>() {
            Ok(year) if (1900..=2100).contains(&year) => return Ok(Some(year)),
            _ => println!("Enter a four-digit year."),
        }
    }
}

fn prompt_choice(prompt: &str, allowed: &[&str]) -> Result<String> {
    loop {
        let input = read_line(prompt)?;
        let input = input.trim().to_lowercase();
        if allowed.contains(&input.as_str()) {
            return Ok(input);
        }
    }
}

fn prompt_nonempty(prompt: &str) -> Result<String> {
    loop {
        let input = read_line(prompt)?;
        let trimmed = input.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    read_input(&mut io::stdin().lock())
}

/// Reads one line, treating a closed stream as an error. Every prompt loop
/// retries on bad input, so EOF must not look like just another bad answer.
fn read_input(input: &mut impl io::BufRead) -> Result<String> {
    let mut buffer = String::new();
    if input.read_line(&mut buffer)? == 0 {
        anyhow::bail!("input stream closed");
    }
    Ok(buffer)
}
