use std::{mem, rc::Rc};

use log::debug;
#[cfg(feature = "debug")]
use log::trace;
use rustc_hash::FxHashMap;

use crate::{
  pool::ListPool,
  set::SlotList,
  unit::{
    AnimationUpdatable, Destroyable, Entry, Hook, LateUpdatable, PhysicsUpdatable, Renderable,
    RendererUpdatable, Slot, Stage, Startable, UnitId, Updatable,
  },
};

struct UnitRecord {
  started: bool,
  doomed: bool,
  slots: [Slot; Stage::COUNT],
  destroy: Option<Hook<dyn Destroyable>>,
}

impl UnitRecord {
  fn new() -> Self {
    UnitRecord {
      started: false,
      doomed: false,
      slots: [Slot::INVALID; Stage::COUNT],
      destroy: None,
    }
  }

  #[inline]
  fn slot(&self, stage: Stage) -> Slot {
    self.slots[stage as usize]
  }
}

/// Drives every behavioral unit's callbacks in a fixed per-frame
/// order.
///
/// Single-threaded and re-entrant: every callback receives
/// `&mut Scheduler` and may register, unregister or destroy any unit,
/// including units of the registry currently being traversed. Update
/// passes iterate from the highest slot to the lowest, so entries
/// appended by a callback land above the descending cursor and are
/// excluded from the current pass, while removals vacate slots in
/// place and are skipped.
///
/// Misuse (double registration, unregistering an unregistered unit,
/// operating on an unknown unit) panics; tolerating it would mask a
/// corrupted index cache.
#[derive(Default)]
pub struct Scheduler {
  units: FxHashMap<UnitId, UnitRecord>,
  unit_ids_free: Vec<UnitId>,
  top_id: UnitId,

  on_start: SlotList<Entry<dyn Startable>>,
  on_update: SlotList<Entry<dyn Updatable>>,
  on_late_update: SlotList<Entry<dyn LateUpdatable>>,
  on_physics_update: SlotList<Entry<dyn PhysicsUpdatable>>,
  animation_updaters: SlotList<Entry<dyn AnimationUpdatable>>,
  renderer_updaters: SlotList<Entry<dyn RendererUpdatable>>,
  renderers: SlotList<Entry<dyn Renderable>>,

  pending_destroy: Vec<UnitId>,
  dispose_destroy: Vec<UnitId>,

  temp_lists: ListPool<UnitId>,
}

macro_rules! stage_ops {
  ($register:ident, $unregister:ident, $field:ident, $stage:expr, $hook:ty) => {
    pub fn $register(&mut self, id: UnitId, hook: Hook<$hook>) {
      #[cfg(feature = "debug")]
      trace!("Registering Unit {} for {:?}", id, $stage);

      register_in(&mut self.$field, &mut self.units, $stage, id, hook);
    }

    pub fn $unregister(&mut self, id: UnitId) {
      #[cfg(feature = "debug")]
      trace!("Unregistering Unit {} from {:?}", id, $stage);

      unregister_in(&mut self.$field, &mut self.units, $stage, id);
    }
  };
}

impl Scheduler {
  pub fn new() -> Self {
    debug!("Creating Scheduler");
    Scheduler::default()
  }

  pub fn create_unit(&mut self) -> UnitId {
    let id = if let Some(id) = self.unit_ids_free.pop() {
      id
    } else {
      let tmp = self.top_id;
      self.top_id += 1;
      tmp
    };

    #[cfg(feature = "debug")]
    trace!("Creating Unit {}", id);

    self.units.insert(id, UnitRecord::new());
    id
  }

  /// Installs the teardown callback fired by [`flush_destroys`](Scheduler::flush_destroys).
  pub fn set_destroy_hook(&mut self, id: UnitId, hook: Hook<dyn Destroyable>) {
    let record = self.units.get_mut(&id).expect("unknown unit");
    record.destroy = Some(hook);
  }

  stage_ops!(register_start, unregister_start, on_start, Stage::Start, dyn Startable);
  stage_ops!(register_update, unregister_update, on_update, Stage::Update, dyn Updatable);
  stage_ops!(
    register_late_update,
    unregister_late_update,
    on_late_update,
    Stage::LateUpdate,
    dyn LateUpdatable
  );
  stage_ops!(
    register_physics_update,
    unregister_physics_update,
    on_physics_update,
    Stage::PhysicsUpdate,
    dyn PhysicsUpdatable
  );
  stage_ops!(
    register_animation_update,
    unregister_animation_update,
    animation_updaters,
    Stage::AnimationUpdate,
    dyn AnimationUpdatable
  );
  stage_ops!(
    register_renderer_update,
    unregister_renderer_update,
    renderer_updaters,
    Stage::RendererUpdate,
    dyn RendererUpdatable
  );
  stage_ops!(register_renderer, unregister_renderer, renderers, Stage::Draw, dyn Renderable);

  /// Unregisters the unit from every stage it currently occupies. The
  /// disable/destroy path: the unit stops receiving callbacks
  /// immediately, even mid-pass.
  pub fn deactivate_unit(&mut self, id: UnitId) {
    #[cfg(feature = "debug")]
    trace!("Deactivating Unit {}", id);

    let slots = self.units.get(&id).expect("unknown unit").slots;
    if slots[Stage::Start as usize].is_valid() {
      self.unregister_start(id);
    }
    if slots[Stage::Update as usize].is_valid() {
      self.unregister_update(id);
    }
    if slots[Stage::LateUpdate as usize].is_valid() {
      self.unregister_late_update(id);
    }
    if slots[Stage::PhysicsUpdate as usize].is_valid() {
      self.unregister_physics_update(id);
    }
    if slots[Stage::AnimationUpdate as usize].is_valid() {
      self.unregister_animation_update(id);
    }
    if slots[Stage::RendererUpdate as usize].is_valid() {
      self.unregister_renderer_update(id);
    }
    if slots[Stage::Draw as usize].is_valid() {
      self.unregister_renderer(id);
    }
  }

  /// One-shot start pass. Forward iteration with the bound re-read
  /// every step, so units registered for start from inside another
  /// unit's start callback are started in the same pass. Afterwards
  /// the whole registry is cleared; entries are not individually
  /// unregistered because the pass is exhaustive.
  pub fn run_on_start(&mut self) {
    #[cfg(feature = "debug")]
    trace!("Running start pass");

    self.on_start.begin_loop();
    let mut index = 0;
    while index < self.on_start.len() {
      let Some(entry) = self.on_start.get(index) else {
        index += 1;
        continue;
      };
      let id = entry.id;
      let hook = Rc::clone(&entry.hook);
      index += 1;

      let Some(record) = self.units.get_mut(&id) else {
        continue;
      };
      // consume the start slot before the callback runs, so a
      // destruction triggered from inside it cannot double-fire; the
      // registry is cleared wholesale below
      record.slots[Stage::Start as usize] = Slot::INVALID;
      if record.doomed {
        continue;
      }
      record.started = true;
      hook.borrow_mut().on_start(self);
    }
    self.on_start.end_loop();
    self.on_start.clear();
  }

  pub fn run_on_update(&mut self, dt: f32) {
    #[cfg(feature = "debug")]
    trace!("Running update pass");

    self.on_update.begin_loop();
    let mut index = self.on_update.len();
    while index > 0 {
      index -= 1;
      let Some(entry) = self.on_update.get(index) else {
        continue;
      };
      let id = entry.id;
      let hook = Rc::clone(&entry.hook);

      let Some(record) = self.units.get(&id) else {
        continue;
      };
      // units registered this frame start next frame
      if !record.started || record.doomed {
        continue;
      }
      hook.borrow_mut().on_update(self, dt);
    }
    self.on_update.end_loop();
  }

  pub fn run_on_late_update(&mut self, dt: f32) {
    #[cfg(feature = "debug")]
    trace!("Running late update pass");

    self.on_late_update.begin_loop();
    let mut index = self.on_late_update.len();
    while index > 0 {
      index -= 1;
      let Some(entry) = self.on_late_update.get(index) else {
        continue;
      };
      let id = entry.id;
      let hook = Rc::clone(&entry.hook);

      let Some(record) = self.units.get(&id) else {
        continue;
      };
      if !record.started || record.doomed {
        continue;
      }
      hook.borrow_mut().on_late_update(self, dt);
    }
    self.on_late_update.end_loop();
  }

  pub fn run_on_physics_update(&mut self) {
    #[cfg(feature = "debug")]
    trace!("Running physics update pass");

    self.on_physics_update.begin_loop();
    let mut index = self.on_physics_update.len();
    while index > 0 {
      index -= 1;
      let Some(entry) = self.on_physics_update.get(index) else {
        continue;
      };
      let id = entry.id;
      let hook = Rc::clone(&entry.hook);

      let Some(record) = self.units.get(&id) else {
        continue;
      };
      if !record.started || record.doomed {
        continue;
      }
      hook.borrow_mut().on_physics_update(self);
    }
    self.on_physics_update.end_loop();
  }

  /// Animation updaters have no start phase; invocation is
  /// unconditional for every live unit.
  pub fn run_animation_update(&mut self, dt: f32) {
    #[cfg(feature = "debug")]
    trace!("Running animation update pass");

    self.animation_updaters.begin_loop();
    let mut index = self.animation_updaters.len();
    while index > 0 {
      index -= 1;
      let Some(entry) = self.animation_updaters.get(index) else {
        continue;
      };
      let id = entry.id;
      let hook = Rc::clone(&entry.hook);

      let Some(record) = self.units.get(&id) else {
        continue;
      };
      if record.doomed {
        continue;
      }
      hook.borrow_mut().on_animation_update(self, dt);
    }
    self.animation_updaters.end_loop();
  }

  pub fn run_renderer_update(&mut self, dt: f32) {
    #[cfg(feature = "debug")]
    trace!("Running renderer update pass");

    self.renderer_updaters.begin_loop();
    let mut index = self.renderer_updaters.len();
    while index > 0 {
      index -= 1;
      let Some(entry) = self.renderer_updaters.get(index) else {
        continue;
      };
      let id = entry.id;
      let hook = Rc::clone(&entry.hook);

      let Some(record) = self.units.get(&id) else {
        continue;
      };
      if record.doomed {
        continue;
      }
      hook.borrow_mut().on_renderer_update(self, dt);
    }
    self.renderer_updaters.end_loop();
  }

  /// Hands every live renderer to the render backend, guarded like any
  /// other pass. The scheduler runs no callback of its own here.
  pub fn visit_renderers(&mut self, mut f: impl FnMut(UnitId, &mut dyn Renderable)) {
    self.renderers.begin_loop();
    let mut index = self.renderers.len();
    while index > 0 {
      index -= 1;
      let Some(entry) = self.renderers.get(index) else {
        continue;
      };
      let id = entry.id;
      let hook = Rc::clone(&entry.hook);

      let Some(record) = self.units.get(&id) else {
        continue;
      };
      if record.doomed {
        continue;
      }
      f(id, &mut *hook.borrow_mut());
    }
    self.renderers.end_loop();
  }

  /// Queues the unit for destruction at the end of the next frame.
  /// Does not unregister it; disable must have happened already (the
  /// unit stops receiving callbacks the instant it is doomed, not one
  /// frame later). Re-enqueueing a doomed unit is a no-op, so the
  /// teardown callback fires exactly once.
  pub fn enqueue_destroy(&mut self, id: UnitId) {
    let record = self.units.get_mut(&id).expect("unknown unit");
    if record.doomed {
      return;
    }
    record.doomed = true;
    self.pending_destroy.push(id);

    #[cfg(feature = "debug")]
    trace!("Unit {} queued for destruction", id);
  }

  /// Fires teardown for everything queued one frame ago, then rotates
  /// this frame's queue into the dispose bin. Called once per frame,
  /// after every update-category pass, so a teardown callback never
  /// observes a frame in which its unit was still updated.
  pub fn flush_destroys(&mut self) {
    while let Some(id) = self.dispose_destroy.pop() {
      let Some(record) = self.units.remove(&id) else {
        continue;
      };
      debug_assert!(
        record.slots.iter().all(|slot| !slot.is_valid()),
        "unit {id} destroyed while still registered"
      );

      #[cfg(feature = "debug")]
      trace!("Destroying Unit {}", id);

      if let Some(hook) = record.destroy {
        hook.borrow_mut().on_destroy(self);
      }
      self.unit_ids_free.push(id);
    }

    mem::swap(&mut self.pending_destroy, &mut self.dispose_destroy);
  }

  pub fn borrow_temp_list(&mut self) -> Vec<UnitId> {
    self.temp_lists.acquire()
  }

  pub fn return_temp_list(&mut self, list: Vec<UnitId>) {
    self.temp_lists.release(list);
  }

  /// Compacts every registry, repairing the cached slots of moved
  /// entries. Amortized: the frame driver calls this every few frames,
  /// not necessarily every frame; holes only accumulate from removals
  /// that happened mid-pass.
  pub fn garbage_collect(&mut self) {
    #[cfg(feature = "debug")]
    trace!("Compacting registries");

    collect_in(&mut self.on_start, &mut self.units, Stage::Start);
    collect_in(&mut self.on_update, &mut self.units, Stage::Update);
    collect_in(&mut self.on_late_update, &mut self.units, Stage::LateUpdate);
    collect_in(&mut self.on_physics_update, &mut self.units, Stage::PhysicsUpdate);
    collect_in(&mut self.animation_updaters, &mut self.units, Stage::AnimationUpdate);
    collect_in(&mut self.renderer_updaters, &mut self.units, Stage::RendererUpdate);
    collect_in(&mut self.renderers, &mut self.units, Stage::Draw);
  }

  pub fn contains(&self, id: UnitId) -> bool {
    self.units.contains_key(&id)
  }

  pub fn is_started(&self, id: UnitId) -> bool {
    self.units.get(&id).map(|record| record.started).unwrap_or(false)
  }

  pub fn is_registered(&self, id: UnitId, stage: Stage) -> bool {
    self
      .units
      .get(&id)
      .map(|record| record.slot(stage).is_valid())
      .unwrap_or(false)
  }

  pub fn live_units(&self) -> usize {
    self.units.len()
  }
}

fn register_in<H: ?Sized>(
  set: &mut SlotList<Entry<H>>,
  units: &mut FxHashMap<UnitId, UnitRecord>,
  stage: Stage,
  id: UnitId,
  hook: Hook<H>,
) {
  let record = units.get_mut(&id).expect("unknown unit");
  assert!(
    !record.slot(stage).is_valid(),
    "unit {id} already registered for {stage:?}"
  );
  let index = set.add(Entry { id, hook });
  record.slots[stage as usize] = Slot::new(index);
}

fn unregister_in<H: ?Sized>(
  set: &mut SlotList<Entry<H>>,
  units: &mut FxHashMap<UnitId, UnitRecord>,
  stage: Stage,
  id: UnitId,
) {
  let record = units.get_mut(&id).expect("unknown unit");
  let slot = record.slot(stage);
  assert!(slot.is_valid(), "unit {id} not registered for {stage:?}");
  record.slots[stage as usize] = Slot::INVALID;

  let moved = set.delete_by_index(slot.index()).map(|entry| entry.id);
  if let Some(moved_id) = moved {
    let moved_record = units.get_mut(&moved_id).expect("unknown unit");
    moved_record.slots[stage as usize] = slot;
  }
}

fn collect_in<H: ?Sized>(
  set: &mut SlotList<Entry<H>>,
  units: &mut FxHashMap<UnitId, UnitRecord>,
  stage: Stage,
) {
  set.garbage_collect(|entry, index| {
    if let Some(record) = units.get_mut(&entry.id) {
      record.slots[stage as usize] = Slot::new(index);
    }
  });
}
