use std::rc::Rc;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use clap::Subcommand;
use focusgate_core::storage::Database;
use focusgate_core::timer::{drive, DriveOutcome};
use focusgate_core::{
    Access, Clock, Config, EntitlementGate, Event, FocusEngine, ManualClock, PremiumFeature,
    SystemClock, TimerConfig, TimerMode, TimerState,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{load_entitlement, owner_of, print_json, signed_in_owner, CmdResult};
use crate::notifier::TerminalNotifier;

const TIMER_KEY: &str = "timer_state";

#[derive(Subcommand)]
pub enum TimerAction {
    /// Print current timer state as JSON
    Status,
    /// Run the timer in the foreground until it goes idle or Ctrl-C
    Run {
        /// Block distractions while running (premium)
        #[arg(long)]
        block_distractions: bool,
    },
    /// Start the countdown
    Start,
    /// Pause the countdown
    Pause,
    /// Restore the full duration of the current mode
    Reset,
    /// Finish the current interval now
    Skip,
    /// Switch to another mode (timer must be paused)
    Mode {
        /// work, short-break or long-break
        mode: TimerMode,
    },
    /// Focus score for the next completed work interval (clamped to 100)
    Score { score: u8 },
}

/// What survives between CLI invocations.
#[derive(Debug, Serialize, Deserialize)]
struct SavedTimer {
    state: TimerState,
    /// Settings the saved interval was running under.
    config: TimerConfig,
    focus_score: u8,
    saved_at: DateTime<Utc>,
}

fn load_engine(
    db: &Rc<Database>,
    config: &Config,
    clock: Arc<dyn Clock>,
) -> Result<FocusEngine, Box<dyn std::error::Error>> {
    let saved = match db.load_json::<SavedTimer>(TIMER_KEY) {
        Ok(saved) => saved,
        Err(e) => {
            warn!(error = %e, "discarding unreadable timer state");
            None
        }
    };
    let Some(saved) = saved else {
        let engine = FocusEngine::new(
            config.timer.clone(),
            db.clone(),
            Rc::new(TerminalNotifier),
            clock,
        )?;
        return Ok(engine.with_owner(owner_of(config)));
    };

    let mut state = saved.state;
    state.remaining_secs = state
        .remaining_secs
        .min(saved.config.duration_secs(state.mode));
    let replay = Arc::new(ManualClock::new(saved.saved_at));
    let mut engine = FocusEngine::restore(
        saved.config.clone(),
        state,
        db.clone(),
        Rc::new(TerminalNotifier),
        replay.clone(),
    )?
    .with_owner(owner_of(config));
    engine.set_focus_score(saved.focus_score);
    if engine.is_running() {
        catch_up(&mut engine, &replay, clock.now());
    }

    let mut engine = engine.with_clock(clock);
    if saved.config != config.timer {
        let event = engine.replace_config(config.timer.clone())?;
        debug!(?event, "timer settings changed since last run");
    }
    Ok(engine)
}

/// Replay the seconds that passed since a running state was saved. `replay`
/// starts at the save time and moves one second per tick, so a completion
/// is stamped with the moment the interval actually ended.
fn catch_up(engine: &mut FocusEngine, replay: &ManualClock, now: DateTime<Utc>) {
    let elapsed = (now - replay.now()).num_seconds().max(0) as u64;
    let elapsed = elapsed.min(engine.state().remaining_secs);
    debug!(elapsed, "catching up running timer");
    for _ in 0..elapsed {
        replay.advance(Duration::seconds(1));
        if let Some(event) = engine.tick() {
            emit(&event);
            break;
        }
    }
}

fn save_engine(db: &Database, engine: &FocusEngine, now: DateTime<Utc>) -> CmdResult {
    db.save_json(
        TIMER_KEY,
        &SavedTimer {
            state: engine.state(),
            config: engine.config().clone(),
            focus_score: engine.focus_score(),
            saved_at: now,
        },
    )?;
    Ok(())
}

fn emit(event: &Event) {
    match serde_json::to_string(event) {
        Ok(json) => println!("{json}"),
        Err(e) => warn!(error = %e, "could not encode event"),
    }
}

pub async fn run(action: TimerAction) -> CmdResult {
    let config = Config::load()?;
    let db = Rc::new(Database::open()?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut engine = load_engine(&db, &config, clock.clone())?;

    match action {
        TimerAction::Status => print_json(&engine.snapshot())?,
        TimerAction::Run { block_distractions } => {
            if block_distractions {
                let owner_id = signed_in_owner(&config)?;
                let gate = EntitlementGate::new(load_entitlement(&db, &owner_id)?);
                if let Access::Denied { .. } =
                    gate.require_feature_access(clock.now(), PremiumFeature::DistractionBlocking)
                {
                    return Err("distraction blocking requires premium; run `premium unlock`".into());
                }
                info!("distraction blocking enabled");
            }
            let outcome = drive(
                &mut engine,
                async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!(error = %e, "ctrl-c handler unavailable");
                        std::future::pending::<()>().await;
                    }
                },
                emit,
                |engine| {
                    let snapshot = engine.snapshot();
                    eprint!("\r{} {}  ", snapshot.label, snapshot.display);
                },
            )
            .await;
            eprintln!();
            if outcome == DriveOutcome::Interrupted {
                info!("timer interrupted; state saved");
            }
            print_json(&engine.snapshot())?;
        }
        TimerAction::Start => match engine.start() {
            Some(event) => print_json(&event)?,
            None => print_json(&engine.snapshot())?,
        },
        TimerAction::Pause => match engine.pause() {
            Some(event) => print_json(&event)?,
            None => print_json(&engine.snapshot())?,
        },
        TimerAction::Reset => print_json(&engine.reset())?,
        TimerAction::Skip => print_json(&engine.skip())?,
        TimerAction::Mode { mode } => print_json(&engine.switch_mode(mode)?)?,
        TimerAction::Score { score } => {
            engine.set_focus_score(score);
            print_json(&engine.snapshot())?;
        }
    }

    save_engine(&db, &engine, clock.now())
}
