//! Abduction Engine - demo host loop.
//!
//! Drives a `GameClock` the way the game's frame loop does: call `update()`
//! once per frame and let rollovers and timers fire.
//!
//! Environment:
//! - `CLOCK_CONFIG` - path to a JSON clock configuration (optional)
//! - `DEMO_SECONDS` - how long to run (default 10)
//! - `WEATHER_SEED` - fixed starting seed for weather rolls (optional)
//! - `RUST_LOG` - tracing filter

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use abduction_engine::{
    ClockConfig, ClockEvent, GameClock, RandomPort, RolloverKind, SeededRandom, SystemClock,
    SystemRandom, TickMode,
};

/// Roughly one frame at 60 Hz
const FRAME: Duration = Duration::from_millis(16);

fn main() -> anyhow::Result<()> {
    load_dotenv_from_repo_root();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "abduction_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Abduction Engine clock demo");

    let config = load_config()?;
    let demo_seconds: u64 = std::env::var("DEMO_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(10);

    let mut clock = GameClock::new(&config, Arc::new(SystemClock::new()))
        .context("invalid clock configuration")?;
    clock.set_tick_mode(TickMode::Fast);
    tracing::info!(date = %clock.date(), "Clock ready");

    clock.subscribe(RolloverKind::Hour, |clock, _| {
        let range = clock.temperature_range();
        tracing::debug!(
            date = %clock.date(),
            min = range.min,
            max = range.max,
            "Hour passed"
        );
    });

    let random = weather_random();
    clock.subscribe(RolloverKind::Day, move |clock, _| {
        let mut rng = StdRng::seed_from_u64(random.next_seed());
        let weather = clock.month_entry().weather();
        match weather.select_new_weather_type(&mut rng) {
            Ok(kind) => tracing::info!(
                date = %clock.date(),
                weather = kind.name(),
                minutes = weather.select_duration(&mut rng),
                "New day"
            ),
            Err(e) => tracing::warn!(error = %e, "No weather for this month"),
        }
    });

    for kind in [RolloverKind::Month, RolloverKind::Year] {
        clock.subscribe(kind, |_, event| {
            if let ClockEvent::Rollover { kind, date } = event {
                tracing::info!(event = kind.event_name(), date = %date, "Rollover");
            }
        });
    }

    clock.set_interval(6 * 60, Some(json!({ "reminder": "patrol" })), |clock, event| {
        if let ClockEvent::Timer { data, .. } = event {
            tracing::info!(at = clock.current(), ?data, "Interval fired");
        }
    })?;

    let deadline = Instant::now() + Duration::from_secs(demo_seconds);
    let mut ticks = 0;
    while Instant::now() < deadline {
        ticks += clock.update()?;
        std::thread::sleep(FRAME);
    }

    tracing::info!(ticks, date = %clock.date(), "Demo finished");
    Ok(())
}

fn load_config() -> anyhow::Result<ClockConfig> {
    let Some(path) = std::env::var("CLOCK_CONFIG").ok().filter(|s| !s.trim().is_empty()) else {
        tracing::info!("CLOCK_CONFIG not set, using the standard calendar");
        return Ok(ClockConfig::default());
    };

    tracing::info!("Loading clock configuration from {}", path);
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read clock configuration '{}'", path))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse clock configuration '{}'", path))
}

fn weather_random() -> Arc<dyn RandomPort> {
    match std::env::var("WEATHER_SEED").ok().and_then(|s| s.parse().ok()) {
        Some(seed) => {
            tracing::info!(seed, "Weather rolls are reproducible");
            Arc::new(SeededRandom::new(seed))
        }
        None => Arc::new(SystemRandom),
    }
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
