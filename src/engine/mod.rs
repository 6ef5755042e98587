use std::time::{Duration, Instant};

use cadre_sched::Scheduler;
use log::info;
#[cfg(feature = "debug")]
use log::trace;

use crate::{
  config::{EngineConfig, EngineError},
  scene::Camera,
};

/// External collaborators of the frame loop. Everything the scheduler
/// does not own — device polling, the physics step, the close signal —
/// comes in through here, so tests implement only what they observe.
pub trait FrameHooks {
  fn poll_input(&mut self) {}

  fn step_physics(&mut self, _dt: f32) {}

  fn should_close(&self) -> bool {
    false
  }
}

pub struct Cadre {
  sched: Scheduler,
  cameras: Vec<Camera>,
  config: EngineConfig,
  frame: u64,
}

pub struct CadreBuilder {
  config: EngineConfig,
  cameras: Vec<Camera>,
}

impl Cadre {
  pub fn builder(config: EngineConfig) -> CadreBuilder {
    CadreBuilder::new(config)
  }

  pub fn scheduler(&self) -> &Scheduler {
    &self.sched
  }

  pub fn scheduler_mut(&mut self) -> &mut Scheduler {
    &mut self.sched
  }

  pub fn cameras_mut(&mut self) -> &mut Vec<Camera> {
    &mut self.cameras
  }

  pub fn frame(&self) -> u64 {
    self.frame
  }

  /// One tick in the contractual order: input, physics, start pass,
  /// update passes, camera traversal, destroy flush, then amortized
  /// compaction.
  pub fn run_frame(&mut self, hooks: &mut impl FrameHooks, dt: f32) {
    hooks.poll_input();

    hooks.step_physics(dt);
    self.sched.run_on_physics_update();

    self.sched.run_on_start();
    self.sched.run_on_update(dt);
    self.sched.run_animation_update(dt);
    self.sched.run_on_late_update(dt);
    self.sched.run_renderer_update(dt);

    for camera in &mut self.cameras {
      camera.render(&mut self.sched);
    }

    self.sched.flush_destroys();

    self.frame += 1;
    if self.frame % u64::from(self.config.gc_interval) == 0 {
      self.sched.garbage_collect();
    }

    #[cfg(feature = "debug")]
    trace!("Frame {} complete", self.frame);
  }

  pub fn run(mut self, hooks: &mut impl FrameHooks) {
    info!("Starting Engine");
    let time_per_frame = Duration::from_secs(1) / self.config.fps;
    let mut last_frame = Instant::now();

    while !hooks.should_close() {
      let elapsed = last_frame.elapsed();
      if elapsed >= time_per_frame {
        last_frame = Instant::now();
        self.run_frame(hooks, elapsed.as_secs_f32());
      }
    }
    info!("Engine stopped after {} frames", self.frame);
  }
}

impl CadreBuilder {
  pub fn new(config: EngineConfig) -> Self {
    #[cfg(feature = "debug")]
    {
      let _ = env_logger::try_init();
    }

    CadreBuilder {
      config,
      cameras: Vec::new(),
    }
  }

  pub fn add_camera(mut self, camera: Camera) -> Self {
    self.cameras.push(camera);
    self
  }

  pub fn build(self) -> Result<Cadre, EngineError> {
    self.config.validate()?;
    info!("Building Engine");

    Ok(Cadre {
      sched: Scheduler::new(),
      cameras: self.cameras,
      config: self.config,
      frame: 0,
    })
  }
}

#[cfg(test)]
mod test {
  use std::{cell::RefCell, rc::Rc};

  use cadre_sched::{
    LateUpdatable, PhysicsUpdatable, Scheduler, Startable, Updatable,
  };

  use super::{Cadre, FrameHooks};
  use crate::config::{EngineConfig, EngineError};

  type Log = Rc<RefCell<Vec<&'static str>>>;

  struct Hooks {
    log: Log,
  }

  impl FrameHooks for Hooks {
    fn poll_input(&mut self) {
      self.log.borrow_mut().push("input");
    }

    fn step_physics(&mut self, _dt: f32) {
      self.log.borrow_mut().push("physics");
    }
  }

  struct Tracer {
    log: Log,
  }

  impl Startable for Tracer {
    fn on_start(&mut self, _sched: &mut Scheduler) {
      self.log.borrow_mut().push("start");
    }
  }

  impl Updatable for Tracer {
    fn on_update(&mut self, _sched: &mut Scheduler, _dt: f32) {
      self.log.borrow_mut().push("update");
    }
  }

  impl LateUpdatable for Tracer {
    fn on_late_update(&mut self, _sched: &mut Scheduler, _dt: f32) {
      self.log.borrow_mut().push("late_update");
    }
  }

  impl PhysicsUpdatable for Tracer {
    fn on_physics_update(&mut self, _sched: &mut Scheduler) {
      self.log.borrow_mut().push("physics_update");
    }
  }

  #[test]
  fn invalid_config_is_rejected() {
    let config = EngineConfig {
      fps: 0,
      ..Default::default()
    };
    assert!(matches!(
      Cadre::builder(config).build(),
      Err(EngineError::InvalidFps)
    ));
  }

  #[test]
  fn frame_follows_the_contractual_order() {
    let mut engine = Cadre::builder(EngineConfig::default()).build().unwrap();
    let log: Log = Rc::new(RefCell::new(Vec::new()));

    let sched = engine.scheduler_mut();
    let id = sched.create_unit();
    let hook = Rc::new(RefCell::new(Tracer { log: log.clone() }));
    sched.register_start(id, hook.clone());
    sched.register_update(id, hook.clone());
    sched.register_late_update(id, hook.clone());
    sched.register_physics_update(id, hook);

    let mut hooks = Hooks { log: log.clone() };

    // frame 1: the physics pass precedes the start pass, so it skips
    // the not-yet-started unit; update and late-update run after the
    // start pass and therefore fire the same frame
    engine.run_frame(&mut hooks, 0.016);
    assert_eq!(*log.borrow(), vec!["input", "physics", "start", "update", "late_update"]);

    log.borrow_mut().clear();
    engine.run_frame(&mut hooks, 0.016);
    assert_eq!(
      *log.borrow(),
      vec!["input", "physics", "physics_update", "update", "late_update"]
    );
    assert_eq!(engine.frame(), 2);
  }
}
