//! Sample State Machine
//!
//! A character with three states driven by a simulated 60 FPS frame loop.
//!
//! Key concepts:
//! - Idle switches to Appeal after standing still for three seconds
//! - Appeal plays a one-shot animation and returns to Idle when it finishes
//! - A click toggles between Idle and Run
//! - Run hands a typed payload to Idle when it stops
//!
//! Run with: cargo run --example sample_state_machine
//! Set RUST_LOG=tickstate=debug to see the machine's own logging.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tickstate::state::{State, StateContext};
use tickstate::{state_id, StateMachineBuilder, TickKind, TransitionError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

state_id! {
    enum Player {
        Idle,
        Appeal,
        Run,
    }
}

const FRAME_TIME: f32 = 1.0 / 60.0;
const TRANSITION_TO_APPEAL_DURATION: f32 = 3.0;
const APPEAL_CLIP_LENGTH: f32 = 1.5;
const RUN_STOP_BONUS: u32 = 10_000;

/// Mouse state sampled once per frame.
#[derive(Default)]
struct Input {
    clicked: Cell<bool>,
}

impl Input {
    fn click_this_frame(&self) -> bool {
        self.clicked.get()
    }
}

/// Plays one clip at a time; one-shot clips complete after their length.
#[derive(Default)]
struct Animator {
    clip: RefCell<&'static str>,
    remaining: Cell<Option<f32>>,
}

impl Animator {
    fn play(&self, clip: &'static str, length: Option<f32>) {
        info!(clip, "Playing animation");
        *self.clip.borrow_mut() = clip;
        self.remaining.set(length);
    }

    fn advance(&self, dt: f32) {
        if let Some(remaining) = self.remaining.get() {
            self.remaining.set(Some((remaining - dt).max(0.0)));
        }
    }

    fn is_completed(&self, clip: &str) -> bool {
        *self.clip.borrow() == clip && self.remaining.get() == Some(0.0)
    }
}

/// Everything the states share with the host.
#[derive(Clone, Default)]
struct Scene {
    input: Rc<Input>,
    animator: Rc<Animator>,
    tutorial: Rc<RefCell<String>>,
}

impl Scene {
    fn show(&self, text: impl Into<String>) {
        let text = text.into();
        println!("  [tutorial] {text}");
        *self.tutorial.borrow_mut() = text;
    }
}

/// Log a rejected transition request; the frame loop keeps running.
fn report(result: Result<(), TransitionError>) {
    if let Err(err) = result {
        warn!(error = %err, "Transition request rejected");
    }
}

struct IdleState {
    scene: Scene,
}

impl State<Player> for IdleState {
    /// Bonus handed over by the state that stopped into Idle.
    type Payload = u32;

    fn id(&self) -> Player {
        Player::Idle
    }

    fn initialize(&mut self, ctx: &StateContext<Player, u32>) {
        let scene = self.scene.clone();
        ctx.begin_stream().subscribe(move |bonus| {
            scene.animator.play("Idle", None);
            scene.show("Click to start running");
            if *bonus > 0 {
                info!(bonus, "Idle entered with a bonus");
            }
        });

        let counter = Rc::new(Cell::new(0.0f32));
        let machine = ctx.machine();
        let elapsed = counter.clone();
        ctx.update_stream()
            .inspect(move |tick| elapsed.set(elapsed.get() + tick.dt))
            .filter({
                let counter = counter.clone();
                move |_| counter.get() > TRANSITION_TO_APPEAL_DURATION
            })
            .subscribe(move |_| {
                report(machine.transition(Player::Appeal));
            });

        let input = self.scene.input.clone();
        let machine = ctx.machine();
        ctx.update_stream()
            .filter(move |_| input.click_this_frame())
            .subscribe(move |_| {
                report(machine.transition(Player::Run));
            });

        ctx.end_stream().subscribe(move |_| counter.set(0.0));
    }
}

struct AppealState {
    scene: Scene,
}

impl State<Player> for AppealState {
    type Payload = ();

    fn id(&self) -> Player {
        Player::Appeal
    }

    fn initialize(&mut self, ctx: &StateContext<Player>) {
        let scene = self.scene.clone();
        ctx.begin_stream().subscribe(move |_| {
            scene.animator.play("Appeal", Some(APPEAL_CLIP_LENGTH));
            scene.show(format!(
                "{} seconds passed, switched to the appeal state",
                TRANSITION_TO_APPEAL_DURATION as u32
            ));
        });

        let animator = self.scene.animator.clone();
        let machine = ctx.machine();
        ctx.update_stream()
            .filter(move |_| animator.is_completed("Appeal"))
            .subscribe(move |_| {
                report(machine.transition_with(Player::Idle, 0u32));
            });

        let input = self.scene.input.clone();
        let machine = ctx.machine();
        ctx.update_stream()
            .filter(move |_| input.click_this_frame())
            .subscribe(move |_| {
                report(machine.transition(Player::Run));
            });
    }
}

struct RunState {
    scene: Scene,
}

impl State<Player> for RunState {
    type Payload = ();

    fn id(&self) -> Player {
        Player::Run
    }

    fn initialize(&mut self, ctx: &StateContext<Player>) {
        let scene = self.scene.clone();
        ctx.begin_stream().subscribe(move |_| {
            scene.animator.play("Run", None);
            scene.show("Click to stop and go back to idle");
        });

        let input = self.scene.input.clone();
        let machine = ctx.machine();
        ctx.update_stream()
            .filter(move |_| input.click_this_frame())
            .subscribe(move |_| {
                info!("Stopping");
                report(machine.transition_with(Player::Idle, RUN_STOP_BONUS));
            });
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    println!("=== Sample State Machine ===\n");

    let scene = Scene::default();
    let mut machine = StateMachineBuilder::new()
        .register(IdleState {
            scene: scene.clone(),
        })
        .register(AppealState {
            scene: scene.clone(),
        })
        .register(RunState {
            scene: scene.clone(),
        })
        .initial_with(Player::Idle, 0u32)
        .build()?;

    // Frames on which the player clicks.
    let clicks = [330u64, 420, 700];

    for frame in 0..720u64 {
        scene.input.clicked.set(clicks.contains(&frame));

        let before = machine.current_state();
        machine.run_frame(FRAME_TIME)?;
        scene.animator.advance(FRAME_TIME);

        let after = machine.current_state();
        if after != before {
            println!(
                "frame {frame:>3} ({:.2}s): {:?} -> {:?}",
                frame as f32 * FRAME_TIME,
                before,
                after
            );
        }
    }

    // A host that only drives some tick kinds can call `tick` directly.
    machine.tick(TickKind::Update, FRAME_TIME)?;
    machine.tick(TickKind::LateUpdate, FRAME_TIME)?;

    println!("\nTransition history:");
    for transition in machine.history().transitions() {
        println!(
            "  frame {:>3}: {:?} -> {:?}",
            transition.frame, transition.from, transition.to
        );
    }
    println!("\nFinal tutorial text: {}", scene.tutorial.borrow());
    println!("\n=== Example Complete ===");

    machine.dispose();
    Ok(())
}
