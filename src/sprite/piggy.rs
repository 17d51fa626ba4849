/// All code relating to individual player states are behind this module and
/// will enforce unrepresentable states, by making it impossible to reach a
/// state transition without using ONLY the methods provided :
/// - PUBLIC  : PiggyState and PiggyContext struct are public
/// - PRIVATE : internal members are private
///
/// The world never touches the typestates directly, it talks to `Piggy`.
use crate::config::PlayerConfig;
use crate::engine::{Point, Rect, Size};
use crate::obstacles::Obstacle;
use crate::sprite::PiggyVisual;
use rand::Rng;
use std::f64::consts::PI;

const MAX_ROTATION: f64 = PI * 0.9;
// rotation speed gained per unit of fall velocity, every tick
const SPIN_GAIN: f64 = 0.001;

// speed levels : base + level * gain, capped
const LEVEL_STEP_BASE: f64 = 28.0;
const LEVEL_STEP_GAIN_Y: f64 = 2.0;
const LEVEL_STEP_GAIN_X: f64 = 1.0;
const LEVEL_EASE_BASE_Y: f64 = 0.18;
const LEVEL_EASE_GAIN_Y: f64 = 0.01;
const LEVEL_EASE_CAP_Y: f64 = 0.32;
const LEVEL_EASE_BASE_X: f64 = 0.12;
const LEVEL_EASE_GAIN_X: f64 = 0.005;
const LEVEL_EASE_CAP_X: f64 = 0.2;

const FALL_VELOCITY_RANGE: std::ops::Range<f64> = 2.0..4.0;
const FALL_SPIN_RANGE: std::ops::Range<f64> = 0.02..0.04;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Player steered by the user
#[derive(Debug, Copy, Clone)]
pub struct Flying;

/// Death fall, the camera carries the vertical motion
#[derive(Debug, Copy, Clone)]
pub struct Falling;

#[derive(Debug, Copy, Clone, PartialEq)]
/// Shared data for :
/// - steering : position + target + per press step + easing
/// - falling  : velocity + rotation
/// - display  : visual
pub struct PiggyContext {
    pub position: Point,
    pub size: Size,
    pub target: Point,
    pub step: Point,
    pub ease: Point,
    pub velocity: f64,
    pub rotation: f64,
    pub rotation_speed: f64,
    pub visual: PiggyVisual,
    /// visible canvas width the player is kept inside of
    pub bounds_width: f64,
}

#[derive(Debug, Copy, Clone)]
pub struct PiggyState<S> {
    context: PiggyContext,
    // _state only differentiates states at compile time (phantom type)
    _state: S,
}

/// generic methods shared between all states
impl<S> PiggyState<S> {
    pub fn context(&self) -> &PiggyContext {
        &self.context
    }

    pub fn resize(mut self, bounds_width: f64) -> Self {
        self.context.bounds_width = bounds_width;
        self
    }
}

impl PiggyState<Flying> {
    pub fn new(config: &PlayerConfig, bounds_width: f64) -> Self {
        let position = Point {
            x: config.start_x,
            y: config.start_y,
        };
        PiggyState {
            context: PiggyContext {
                position,
                size: Size {
                    width: config.width,
                    height: config.height,
                },
                target: position,
                step: Point {
                    x: config.step_x,
                    y: config.step_y,
                },
                ease: Point {
                    x: config.ease_x,
                    y: config.ease_y,
                },
                velocity: 0.0,
                rotation: 0.0,
                rotation_speed: 0.0,
                visual: PiggyVisual::Normal,
                bounds_width,
            },
            _state: Flying,
        }
    }

    pub fn update(mut self, snap_threshold: f64) -> Self {
        self.context = self
            .context
            .ease_toward_target(snap_threshold)
            .clamp_horizontal();
        self
    }

    /// Vertical targets are free, horizontal ones are clamped right away
    pub fn steer(mut self, direction: Direction) -> Self {
        let context = &mut self.context;
        match direction {
            Direction::Up => context.target.y -= context.step.y,
            Direction::Down => context.target.y += context.step.y,
            Direction::Left => {
                context.target.x = (context.target.x - context.step.x).max(context.left_limit())
            }
            Direction::Right => {
                context.target.x = (context.target.x + context.step.x).min(context.right_limit())
            }
        }
        self
    }

    /// Snappier steering as the score grows, one level per `speed_band` points
    pub fn speed_up(mut self, score: u32, config: &PlayerConfig) -> Self {
        let level = f64::from(score / config.speed_band.max(1));
        self.context.step = Point {
            x: (LEVEL_STEP_BASE + level * LEVEL_STEP_GAIN_X).min(config.max_step_x),
            y: (LEVEL_STEP_BASE + level * LEVEL_STEP_GAIN_Y).min(config.max_step_y),
        };
        self.context.ease = Point {
            x: (LEVEL_EASE_BASE_X + level * LEVEL_EASE_GAIN_X).min(LEVEL_EASE_CAP_X),
            y: (LEVEL_EASE_BASE_Y + level * LEVEL_EASE_GAIN_Y).min(LEVEL_EASE_CAP_Y),
        };
        self
    }

    /// Pull the player back up when it sits right on `bottom_limit`, so the
    /// start of the fall stays on screen
    pub fn lift_above(mut self, bottom_limit: f64) -> Self {
        if self.context.position.y > bottom_limit - 10.0 {
            self.context.position.y = bottom_limit - 60.0;
        }
        self
    }

    pub fn fall(self, velocity: f64, rotation_speed: f64) -> PiggyState<Falling> {
        let mut context = self.context;
        context.velocity = velocity;
        context.rotation_speed = rotation_speed;
        // no horizontal drift during the fall
        context.target.x = context.position.x;
        context.visual = PiggyVisual::Sad;
        PiggyState {
            context,
            _state: Falling,
        }
    }
}

impl PiggyState<Falling> {
    /// Position is left alone, the world scrolls past the player instead
    pub fn update(mut self) -> Self {
        self.context = self.context.spin().clamp_position_x();
        self
    }

    pub fn accelerate(mut self, gravity: f64) -> Self {
        self.context.velocity += gravity;
        self.context = self.context.spin();
        self
    }

    pub fn boost(mut self, min_velocity: f64) -> Self {
        self.context.velocity = self.context.velocity.max(min_velocity);
        self
    }

    /// Rest the bottom edge exactly on `ground_top` (screen space)
    pub fn land(mut self, ground_top: f64) -> Self {
        self.context.position.y = ground_top - self.context.size.height / 2.0;
        self
    }

    pub fn fail(mut self) -> Self {
        self.context.visual = PiggyVisual::Failed;
        self
    }
}

impl PiggyContext {
    fn left_limit(&self) -> f64 {
        self.size.width / 2.0
    }

    fn right_limit(&self) -> f64 {
        self.bounds_width - self.size.width / 2.0
    }

    fn ease_toward_target(mut self, snap_threshold: f64) -> Self {
        self.position.y = ease_axis(self.position.y, self.target.y, self.ease.y, snap_threshold);
        self.position.x = ease_axis(self.position.x, self.target.x, self.ease.x, snap_threshold);
        self
    }

    /// keeps both position and target inside the horizontal bounds
    fn clamp_horizontal(mut self) -> Self {
        self.target.x = clamp_to(self.target.x, self.left_limit(), self.right_limit());
        self.clamp_position_x()
    }

    fn clamp_position_x(mut self) -> Self {
        self.position.x = clamp_to(self.position.x, self.left_limit(), self.right_limit());
        self
    }

    fn spin(mut self) -> Self {
        self.rotation_speed += SPIN_GAIN * self.velocity.abs();
        self.rotation = (self.rotation + self.rotation_speed).min(MAX_ROTATION);
        self
    }
}

/// exponential ease that snaps once close enough, no endless creep
fn ease_axis(current: f64, target: f64, ease: f64, snap_threshold: f64) -> f64 {
    let delta = target - current;
    if delta.abs() < snap_threshold {
        target
    } else {
        current + delta * ease
    }
}

// ELI5: f64::clamp panics when min > max (canvas narrower than the pig),
// two comparisons just pick the right edge instead
fn clamp_to(value: f64, min: f64, max: f64) -> f64 {
    let value = if value < min { min } else { value };
    if value > max {
        max
    } else {
        value
    }
}

enum Event {
    Update,
    Resize(f64),
    Steer(Direction),
    SpeedUp(u32),
    LiftAbove(f64),
    Fall { velocity: f64, rotation_speed: f64 },
    Accelerate(f64),
    Boost(f64),
    Land(f64),
    Fail,
}

#[derive(Debug, Copy, Clone)]
enum PiggyStateMachine {
    Flying(PiggyState<Flying>),
    Falling(PiggyState<Falling>),
}

impl From<PiggyState<Flying>> for PiggyStateMachine {
    fn from(state: PiggyState<Flying>) -> Self {
        PiggyStateMachine::Flying(state)
    }
}

impl From<PiggyState<Falling>> for PiggyStateMachine {
    fn from(state: PiggyState<Falling>) -> Self {
        PiggyStateMachine::Falling(state)
    }
}

impl PiggyStateMachine {
    // CONSUMING self and returning the next state, the old state can't be
    // touched after a transition
    fn transition(self, event: Event, config: &PlayerConfig) -> Self {
        use PiggyStateMachine::*;
        match (self, event) {
            (Flying(state), Event::Update) => state.update(config.snap_threshold).into(),
            (Flying(state), Event::Resize(width)) => state.resize(width).into(),
            (Flying(state), Event::Steer(direction)) => state.steer(direction).into(),
            (Flying(state), Event::SpeedUp(score)) => state.speed_up(score, config).into(),
            (Flying(state), Event::LiftAbove(limit)) => state.lift_above(limit).into(),
            (
                Flying(state),
                Event::Fall {
                    velocity,
                    rotation_speed,
                },
            ) => state.fall(velocity, rotation_speed).into(),
            (Falling(state), Event::Update) => state.update().into(),
            (Falling(state), Event::Resize(width)) => state.resize(width).into(),
            (Falling(state), Event::Accelerate(gravity)) => state.accelerate(gravity).into(),
            (Falling(state), Event::Boost(min)) => state.boost(min).into(),
            (Falling(state), Event::Land(ground_top)) => state.land(ground_top).into(),
            (Falling(state), Event::Fail) => state.fail().into(),
            // everything else (steering while falling, falling twice, ...)
            // keeps the current state
            _ => self,
        }
    }

    fn context(&self) -> &PiggyContext {
        match self {
            PiggyStateMachine::Flying(state) => state.context(),
            PiggyStateMachine::Falling(state) => state.context(),
        }
    }
}

/// The player entity
/// - update() -> statemachine transition(Event::Update)
/// - everything else is an Event as well
pub struct Piggy {
    state: PiggyStateMachine,
    config: PlayerConfig,
}

impl Piggy {
    pub fn new(config: PlayerConfig, bounds_width: f64) -> Self {
        Piggy {
            state: PiggyState::new(&config, bounds_width).into(),
            config,
        }
    }

    fn apply(&mut self, event: Event) {
        self.state = self.state.transition(event, &self.config);
    }

    pub fn set_bounds_width(&mut self, bounds_width: f64) {
        self.apply(Event::Resize(bounds_width));
    }

    pub fn update(&mut self) {
        self.apply(Event::Update);
    }

    pub fn request_move(&mut self, direction: Direction) {
        self.apply(Event::Steer(direction));
    }

    pub fn increase_speed(&mut self, score: u32) {
        self.apply(Event::SpeedUp(score));
    }

    pub fn lift_above(&mut self, bottom_limit: f64) {
        self.apply(Event::LiftAbove(bottom_limit));
    }

    /// No-op once falling, so the first kick and spin are kept
    pub fn start_falling<R: Rng>(&mut self, rng: &mut R) {
        if self.is_falling() {
            return;
        }
        let velocity = rng.gen_range(FALL_VELOCITY_RANGE);
        let rotation_speed = rng.gen_range(FALL_SPIN_RANGE);
        log::debug!(
            "piggy: falling with velocity {:.2}, spin {:.3}",
            velocity,
            rotation_speed
        );
        self.apply(Event::Fall {
            velocity,
            rotation_speed,
        });
    }

    /// One tick of gravity, returns the velocity to move the camera by
    pub fn fall_step(&mut self, gravity: f64) -> f64 {
        self.apply(Event::Accelerate(gravity));
        self.velocity()
    }

    pub fn ensure_min_velocity(&mut self, min_velocity: f64) {
        self.apply(Event::Boost(min_velocity));
    }

    pub fn land_on(&mut self, ground_top: f64) {
        self.apply(Event::Land(ground_top));
    }

    pub fn set_failed(&mut self) {
        self.apply(Event::Fail);
    }

    pub fn is_falling(&self) -> bool {
        matches!(self.state, PiggyStateMachine::Falling(_))
    }

    // Law of Demeter : callers ask the pig, not its context
    pub fn position(&self) -> Point {
        self.state.context().position
    }

    pub fn size(&self) -> Size {
        self.state.context().size
    }

    pub fn target(&self) -> Point {
        self.state.context().target
    }

    pub fn step(&self) -> Point {
        self.state.context().step
    }

    pub fn ease(&self) -> Point {
        self.state.context().ease
    }

    pub fn velocity(&self) -> f64 {
        self.state.context().velocity
    }

    pub fn rotation(&self) -> f64 {
        self.state.context().rotation
    }

    pub fn rotation_speed(&self) -> f64 {
        self.state.context().rotation_speed
    }

    pub fn visual(&self) -> PiggyVisual {
        self.state.context().visual
    }

    pub fn bottom(&self) -> f64 {
        self.position().y + self.size().height / 2.0
    }

    pub fn bounding_box(&self) -> Rect {
        Rect::centered_on(self.position(), self.size())
    }

    /// Only the obstacle below the gap is solid (one-sided gap model)
    pub fn check_collision_with_obstacle(&self, obstacle: &Obstacle, camera_y: f64) -> bool {
        self.bounding_box().intersects(&obstacle.hitbox(camera_y))
    }
}
