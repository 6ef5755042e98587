use std::{cell::RefCell, rc::Rc};

use crate::scheduler::Scheduler;

pub type UnitId = u64;

/// Shared handle to a unit's callback object. One concrete script
/// registers clones of the same `Rc` into several categories.
pub type Hook<H> = Rc<RefCell<H>>;

/// Cached position of a unit inside one registry.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Slot(usize);

impl Slot {
  pub(crate) const INVALID: Slot = Slot(usize::MAX);

  #[inline]
  pub(crate) const fn new(index: usize) -> Slot {
    Slot(index)
  }

  #[inline]
  pub(crate) const fn index(self) -> usize {
    self.0
  }

  #[inline]
  pub const fn is_valid(self) -> bool {
    self.0 != usize::MAX
  }
}

/// Callback categories driven once per frame, in the frame driver's
/// contractual order. `Draw` is the renderer list walked by the render
/// backend; the scheduler runs no callback of its own for it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Stage {
  Start,
  Update,
  LateUpdate,
  PhysicsUpdate,
  AnimationUpdate,
  RendererUpdate,
  Draw,
}

impl Stage {
  pub(crate) const COUNT: usize = 7;
}

pub trait Startable {
  fn on_start(&mut self, sched: &mut Scheduler);
}

pub trait Updatable {
  fn on_update(&mut self, sched: &mut Scheduler, dt: f32);
}

pub trait LateUpdatable {
  fn on_late_update(&mut self, sched: &mut Scheduler, dt: f32);
}

pub trait PhysicsUpdatable {
  fn on_physics_update(&mut self, sched: &mut Scheduler);
}

pub trait AnimationUpdatable {
  fn on_animation_update(&mut self, sched: &mut Scheduler, dt: f32);
}

pub trait RendererUpdatable {
  fn on_renderer_update(&mut self, sched: &mut Scheduler, dt: f32);
}

pub trait Renderable {
  fn draw(&mut self);
}

pub trait Destroyable {
  fn on_destroy(&mut self, sched: &mut Scheduler);
}

/// One registry slot: the unit it belongs to plus its callback.
pub(crate) struct Entry<H: ?Sized> {
  pub id: UnitId,
  pub hook: Hook<H>,
}

#[cfg(test)]
mod test {
  use super::Slot;

  #[test]
  fn slot_sentinel() {
    assert!(!Slot::INVALID.is_valid());
    assert!(Slot::new(0).is_valid());
    assert_eq!(Slot::new(7).index(), 7);
  }
}
