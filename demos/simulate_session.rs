//! Simulate one participant through an N-back and an attention session

use cogtrain::attention::{AssetSet, AttentionPhase};
use cogtrain::nback::NBackPhase;
use cogtrain::scheduler::{FrameLoop, TickControl};
use cogtrain::{GazeHub, GazeSample, Group, Participant, TrainingConfig, TrainingProcessor};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const FRAME_MS: f64 = 16.0;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
    }
}

fn run() -> Result<(), cogtrain::TrainingError> {
    let mut config = TrainingConfig::default();
    config.attention.set_duration_sec = 6;
    config.attention.rest_duration_sec = 2;

    let mut processor = TrainingProcessor::in_memory(config)?;
    let participant = Participant::new("demo-user", Group::G1);
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    // N-back: respond to most true matches, with the occasional false alarm
    let mut nback = processor.nback_session(&participant.user_id)?;
    nback.start()?;
    while nback.phase() == NBackPhase::Running {
        let index = nback.current_index();
        let level = nback.level().get() as usize;
        let symbols = &nback.sequence().symbols;
        let is_match = index >= level && symbols[index] == symbols[index - level];
        if (is_match && rng.gen_bool(0.9)) || (!is_match && rng.gen_bool(0.05)) {
            nback.respond();
        }
        nback.expire_stimulus();
    }
    if let Some(completion) = processor.complete_nback(&participant, &mut nback) {
        println!("{}", serde_json::to_string_pretty(&completion)?);
    }

    // Attention: gaze follows the target with jitter
    let assets = AssetSet::new("target.png", vec!["a.png".to_string(), "b.png".to_string()]);
    let mut session = processor.attention_session(&participant.user_id, assets)?;
    session.place_task_area(200.0, 100.0);

    let mut hub = GazeHub::new();
    session.start_set(hub.subscribe())?;
    let mut frames = FrameLoop::new(session);
    let mut now = 0.0;
    frames.start(now);

    loop {
        let task = frames.task();
        let area = task.task_area();
        if let Some(target) = task.objects().iter().find(|o| o.is_target) {
            hub.publish(GazeSample::new(
                area.left + target.x + rng.gen_range(-20.0..20.0),
                area.top + target.y + rng.gen_range(-20.0..20.0),
                now,
            ));
        }

        now += FRAME_MS;
        if frames.frame(now) == TickControl::Continue {
            continue;
        }
        match frames.task().phase() {
            AttentionPhase::Rest => {
                frames.task_mut().start_set(hub.subscribe())?;
                frames.start(now);
            }
            _ => break,
        }
    }

    let mut session = frames.into_task();
    if let Some(completion) = processor.complete_attention(&participant, &mut session) {
        println!("{}", serde_json::to_string_pretty(&completion)?);
    }

    println!("{}", processor.log().to_ndjson()?);
    Ok(())
}
