use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use humantime::format_duration;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::io::BufReader;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use photo_frame_engine::config::Configuration;
use photo_frame_engine::events::{ImageRecord, SlideshowCommand, TimerCommand};
use photo_frame_engine::overlay::timer_label;
use photo_frame_engine::simulation::Simulation;
use photo_frame_engine::slideshow::SlideshowSnapshot;
use photo_frame_engine::store::{JsonFileStore, SettingsStore};
use photo_frame_engine::tasks;
use photo_frame_engine::timer::TimerMachine;
use photo_frame_engine::weather::WeatherState;

#[derive(Debug, Parser)]
#[command(
    name = "photo-frame",
    version,
    about = "Photo frame slideshow and timer engine"
)]
struct Args {
    /// Path to YAML config (compiled-in defaults when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,
    /// Override the settings file location from the config
    #[arg(long = "settings", value_name = "FILE")]
    settings: Option<PathBuf>,
    /// Run both engines for this many ticks without any clock and print the result
    #[arg(long = "simulate", value_name = "TICKS")]
    simulate: Option<u64>,
    /// Deterministic RNG seed for random slideshow order
    #[arg(long = "seed", value_name = "SEED")]
    seed: Option<u64>,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .compact()
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    let result = runtime.block_on(run(args));
    // A pending stdin read would otherwise keep the runtime alive.
    runtime.shutdown_timeout(Duration::from_millis(250));
    result
}

async fn run(args: Args) -> Result<()> {
    let mut cfg = match &args.config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Configuration::default(),
    };
    if let Some(path) = args.settings {
        cfg.settings_path = path;
    }
    let cfg = cfg.validated().context("invalid configuration values")?;
    tracing::info!(
        settings = %cfg.settings_path.display(),
        source = ?cfg.image_source,
        tick = %format_duration(cfg.tick_period),
        image_refresh = %format_duration(cfg.image_refresh_interval),
        weather_refresh = %format_duration(cfg.weather.refresh_interval),
        "configuration loaded"
    );

    let store = SettingsStore::open(JsonFileStore::new(&cfg.settings_path));
    let client = reqwest::Client::builder()
        .timeout(cfg.request_timeout)
        .build()
        .context("failed to build HTTP client")?;
    let seed = args.seed.or(cfg.rng_seed);

    if let Some(ticks) = args.simulate {
        let images = tasks::images::fetch_images(&cfg.image_source, &client).await;
        run_simulation(&store, images, ticks, seed.unwrap_or_else(rand::random));
        return Ok(());
    }

    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    // Snapshots (latest value wins)
    let settings_rx = store.subscribe();
    let initial_timer = TimerMachine::new(&store.timer()).snapshot();
    let (timer_state_tx, timer_state_rx) = watch::channel(initial_timer);
    let (slideshow_state_tx, slideshow_state_rx) = watch::channel(SlideshowSnapshot::default());
    let (images_tx, images_rx) = watch::channel(Vec::<ImageRecord>::new());
    let (weather_tx, weather_rx) = watch::channel(WeatherState::Loading);
    // Commands (small/bounded)
    let (timer_cmd_tx, timer_cmd_rx) = mpsc::channel::<TimerCommand>(16);
    let (slideshow_cmd_tx, slideshow_cmd_rx) = mpsc::channel::<SlideshowCommand>(16);

    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let mut tasks = JoinSet::new();

    tasks.spawn({
        let settings_rx = settings_rx.clone();
        let cancel = cancel.clone();
        let tick_period = cfg.tick_period;
        async move {
            tasks::timer::run(settings_rx, timer_cmd_rx, timer_state_tx, tick_period, cancel)
                .await
                .context("timer task failed")
        }
    });

    tasks.spawn({
        let settings_rx = settings_rx.clone();
        let cancel = cancel.clone();
        let timing = tasks::slideshow::SlideshowTiming {
            tick_period: cfg.tick_period,
            transition_delay: cfg.transition_delay,
        };
        async move {
            tasks::slideshow::run(
                settings_rx,
                images_rx,
                slideshow_cmd_rx,
                slideshow_state_tx,
                timing,
                rng,
                cancel,
            )
            .await
            .context("slideshow task failed")
        }
    });

    tasks.spawn({
        let source = cfg.image_source.clone();
        let client = client.clone();
        let refresh = cfg.image_refresh_interval;
        let cancel = cancel.clone();
        async move {
            tasks::images::run(source, client, refresh, images_tx, cancel)
                .await
                .context("images task failed")
        }
    });

    tasks.spawn({
        let settings_rx = settings_rx.clone();
        let client = client.clone();
        let endpoint = cfg.weather.endpoint.clone();
        let refresh = cfg.weather.refresh_interval;
        let cancel = cancel.clone();
        async move {
            tasks::weather::run(settings_rx, client, endpoint, refresh, weather_tx, cancel)
                .await
                .context("weather task failed")
        }
    });

    tasks.spawn({
        let path = cfg.settings_path.clone();
        let store = store.clone();
        let cancel = cancel.clone();
        async move {
            tasks::settings_watch::run(path, store, cancel)
                .await
                .context("settings watcher failed")
        }
    });

    tasks.spawn({
        let cancel = cancel.clone();
        async move {
            tasks::overlay::run(
                settings_rx,
                timer_state_rx,
                slideshow_state_rx,
                weather_rx,
                cancel,
            )
            .await
            .context("overlay task failed")
        }
    });

    // Ctrl-D on an interactive terminal shuts down; piped input just ends.
    let interactive = std::io::stdin().is_terminal();
    tasks.spawn({
        let store = store.clone();
        let cancel = cancel.clone();
        async move {
            let input = BufReader::new(tokio::io::stdin());
            tasks::control::run(
                input,
                store,
                timer_cmd_tx,
                slideshow_cmd_tx,
                cancel,
                interactive,
            )
            .await
            .context("control task failed")
        }
    });

    // Drain JoinSet; the first failure stops everything else
    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!("task error: {e:?}");
                cancel.cancel();
            }
            Err(e) => {
                tracing::error!("join error: {e}");
                cancel.cancel();
            }
        }
    }

    Ok(())
}

fn run_simulation(store: &SettingsStore, images: Vec<ImageRecord>, ticks: u64, seed: u64) {
    let settings = store.current();
    println!(
        "# simulation\n# images: {}\n# interval: {}s ({:?})\n# timer: {} {:?} {}\n# ticks: {}\n# seed: {}\n",
        images.len(),
        settings.slideshow.rotation_interval_secs,
        settings.slideshow.order,
        if settings.timer.enabled { "on" } else { "off" },
        settings.timer.mode,
        settings.timer.duration,
        ticks,
        seed,
    );

    let mut sim = Simulation::new(&settings, images, seed);
    if settings.timer.enabled {
        sim.timer_mut().start();
    }
    for frame in sim.run(ticks) {
        let mut line = format!(
            "{:>6}: image {}/{} next in {:>3}s",
            frame.tick,
            frame.slideshow.current_index + 1,
            frame.slideshow.image_count,
            frame.slideshow.countdown_remaining,
        );
        if let Some(change) = frame.advanced {
            let name = frame
                .slideshow
                .current
                .as_ref()
                .map_or("-", |img| img.display_name.as_str());
            line.push_str(&format!("  -> {} ({})", change.to, name));
        }
        if settings.timer.enabled {
            line.push_str(&format!(
                "  timer {}",
                timer_label(frame.timer.remaining, frame.timer.phase)
            ));
        }
        if let Some(change) = frame.timer_change {
            line.push_str(&format!("  [{:?} -> {:?}]", change.from, change.to));
        }
        println!("{line}");
    }
    println!(
        "\n# advances: {}, final index: {}",
        sim.slideshow().advances(),
        sim.slideshow().current_index()
    );
}
