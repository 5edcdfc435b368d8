//! Simulated Stroop session
//!
//! Creates a participant, shuffles a block of trials, runs part of it,
//! breaks off, and resumes from disk where it stopped.
//!
//! ```text
//! RUST_LOG=expflow=debug cargo run --example session
//! EXPFLOW_DIR=/tmp/lab EXPFLOW_COMPRESSION=1 cargo run --example session
//! ```

use anyhow::Result;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing_subscriber::EnvFilter;

use expflow::{Advance, Config, ParticipantProfile, Registry, Tracked, Trial};

const WORDS: [&str; 3] = ["RED", "GREEN", "BLUE"];
const TRIALS: u32 = 12;
const BREAK_AFTER: usize = 5;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("expflow=info")),
        )
        .init();

    let registry = Registry::open(&Config::from_env())?;
    if registry.is_ephemeral() {
        println!("No EXPFLOW_DIR set; records go to a temporary directory");
    }

    let mut rng = rand::thread_rng();
    let participant_id = format!("p{:04}", rng.gen_range(0..10_000));
    let mut participant = registry.create_participant(
        &participant_id,
        ParticipantProfile::new().age(27.0).language("en"),
    )?;
    participant.append_comment("demo run")?;
    participant.close()?;

    let trials = (0..TRIALS)
        .map(|i| {
            let word = WORDS[i as usize % WORDS.len()];
            let ink = WORDS[(i as usize / WORDS.len()) % WORDS.len()];
            Trial::builder()
                .trial_number(i)
                .condition(if word == ink { "congruent" } else { "incongruent" })
                .stimulus(serde_json::json!({ "word": word, "ink": ink }))
                .build()
        })
        .collect();
    let mut experiment = registry.create_experiment(&participant_id, "stroop", trials)?;

    let mut order: Vec<usize> = (0..TRIALS as usize).collect();
    order.shuffle(&mut rng);
    experiment.reorder_trials(&order)?;
    experiment.record_event("instructions_shown", None)?;

    // First sitting: the participant asks for a break.
    let mut presented = 0;
    while let Advance::Next { index, trial } = experiment.advance()? {
        let congruent = trial.condition() == Some("congruent");
        respond(&mut experiment, &mut rng, congruent)?;
        presented += 1;
        println!("trial {index} answered");
        if presented == BREAK_AFTER {
            experiment.pause()?;
        }
        if !experiment.is_running() {
            break;
        }
    }
    println!(
        "break after {presented} trials (status {}, cursor {:?})",
        experiment.status(),
        experiment.trial_index()
    );
    experiment.close()?;

    // Second sitting: reload and carry on from the same trial.
    let mut experiment = registry.load_experiment(&participant_id, "stroop")?;
    while let Advance::Next { index, trial } = experiment.advance()? {
        let congruent = trial.condition() == Some("congruent");
        if trial.is_running() && trial.response().is_some() {
            // Resumed trial was already answered before the break.
            println!("trial {index} resumed");
            continue;
        }
        respond(&mut experiment, &mut rng, congruent)?;
        println!("trial {index} answered");
        if !experiment.is_running() {
            break;
        }
    }

    println!(
        "{} {} after {:.3}s active",
        experiment.experiment_id(),
        experiment.status(),
        experiment.duration().unwrap_or_default()
    );
    println!(
        "{participant_id} participated in {:?}",
        registry.participated_in(&participant_id)?
    );
    experiment.close()?;
    Ok(())
}

fn respond(
    experiment: &mut expflow::Experiment,
    rng: &mut impl Rng,
    congruent: bool,
) -> expflow::Result<()> {
    let base = if congruent { 480.0 } else { 560.0 };
    let rt_ms: f64 = base + rng.gen_range(-60.0..120.0);
    experiment.record_response(serde_json::json!({
        "rt_ms": rt_ms,
        "correct": rng.gen_bool(0.93),
    }))
}
