//! Headless frame driver: runs a scripted standard session and reports the
//! results.
//!
//! ```text
//! kitchen-headless [DATA_DIR] [--results PATH]
//! ```
//!
//! `DATA_DIR` defaults to the bundled `data/` directory. Set `RUST_LOG` to
//! change verbosity, e.g. `RUST_LOG=kitchen_core=debug`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use kitchen_core::clock::GameState;
use kitchen_core::counter::SubmitOutcome;
use kitchen_core::event::{Event, EventKind};
use kitchen_core::fixed::{Seconds, f64_to_fixed64, fixed64_to_f64};
use kitchen_core::flow::{Scene, SceneFlow};
use kitchen_core::item::{Bundle, ItemKind};
use kitchen_core::ledger::ResultLedger;
use kitchen_core::session::Session;
use kitchen_data::load_kitchen;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Frame length of the driver.
const FRAME: f64 = 0.1;
/// The scripted cook finishes a plate this often.
const COOK_TIME: f64 = 3.0;
/// Every n-th plate is deliberately wrong.
const WRONG_EVERY: u32 = 5;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(env_filter)
        .init();
}

struct Args {
    data_dir: PathBuf,
    results: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut data_dir = None;
    let mut results = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--results" => {
                let path = args.next().context("--results needs a path")?;
                results = Some(PathBuf::from(path));
            }
            flag if flag.starts_with("--") => bail!("unknown flag {flag}"),
            dir => data_dir = Some(PathBuf::from(dir)),
        }
    }
    Ok(Args {
        data_dir: data_dir
            .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("data")),
        results,
    })
}

/// Play one session through the scene flow until the clock reports game
/// over. Returns the final ledger.
fn run_session(data_dir: &Path, results: Option<PathBuf>) -> Result<ResultLedger> {
    let mut data = load_kitchen(data_dir)
        .with_context(|| format!("loading kitchen data from {}", data_dir.display()))?;
    if results.is_some() {
        data.config.results_path = results;
    }

    let mut session = Session::new(data.catalog, data.config);
    session.subscribe(
        EventKind::DialogueShown,
        Box::new(|event: &Event| {
            if let Event::DialogueShown { line } = event {
                tracing::info!(line, "agent speaks");
            }
        }),
    );

    let mut flow = SceneFlow::new();
    flow.select_npc(&mut session);

    let frame: Seconds = f64_to_fixed64(FRAME);
    let cook_time: Seconds = f64_to_fixed64(COOK_TIME);
    let mut cooking = cook_time;
    let mut plates = 0u32;

    loop {
        if let Some(scene) = flow.tick(frame, &mut session) {
            tracing::info!(?scene, "scene loaded");
        }
        if flow.scene() != Scene::Game {
            continue;
        }

        let report = session.tick(frame);
        if report.flushed {
            tracing::info!("results written");
        }
        if session.clock().state() == GameState::GameOver {
            break;
        }
        if !session.clock().is_playing() {
            continue;
        }

        cooking -= frame;
        if cooking > Seconds::ZERO {
            continue;
        }
        cooking = cook_time;

        if session.player_item().is_none() {
            plates += 1;
            let bundle = next_plate(&session, plates % WRONG_EVERY == 0);
            session.give_player(ItemKind::Plate(bundle))?;
        }
        match session.submit() {
            SubmitOutcome::Accepted { matched, route } => {
                tracing::info!(
                    matched,
                    ?route,
                    left = fixed64_to_f64(session.clock().playing_remaining()),
                    "plate delivered"
                );
            }
            SubmitOutcome::Rejected(reason) => tracing::debug!(?reason, "counter busy"),
        }
    }

    session.teardown();
    Ok(*session.ledger())
}

/// The ingredients of the oldest wanted order, or a deliberately wrong
/// plate.
fn next_plate(session: &Session, wrong: bool) -> Bundle {
    let catalog = session.catalog();
    let wanted = session
        .order_book()
        .wanted()
        .first()
        .and_then(|order| catalog.get_recipe(order.recipe));
    match wanted {
        Some(def) if !wrong => def.ingredients.iter().copied().collect(),
        Some(def) => def.ingredients.iter().skip(1).copied().collect(),
        None => Bundle::new(),
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = parse_args()?;

    let first = run_session(&args.data_dir, args.results.clone())?;
    let second = run_session(&args.data_dir, None)?;

    println!("{}", first.render());
    if first != second {
        bail!("determinism check failed: {first:?} != {second:?}");
    }
    println!("Determinism: PASS");
    Ok(())
}
