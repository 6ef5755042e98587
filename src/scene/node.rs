use std::{cell::RefCell, rc::Rc};

use cadre_sched::{Destroyable, LateUpdatable, Scheduler, Startable, UnitId, Updatable};

/// A scene-graph node owning its attached scripts and children.
///
/// Transforms live elsewhere; nodes only drive the registration
/// boundary of the scheduler: attaching scripts, cascading
/// enable/disable through a subtree and queueing subtree destruction.
pub struct Node {
  name: String,
  active: bool,
  scripts: Vec<Attached>,
  children: Vec<Node>,
}

struct Attached {
  unit: UnitId,
  start: Rc<RefCell<dyn Startable>>,
  update: Rc<RefCell<dyn Updatable>>,
  late_update: Rc<RefCell<dyn LateUpdatable>>,
}

impl Attached {
  fn register(&self, sched: &mut Scheduler) {
    // a unit that already received its one-shot start is not re-queued
    if !sched.is_started(self.unit) {
      sched.register_start(self.unit, self.start.clone());
    }
    sched.register_update(self.unit, self.update.clone());
    sched.register_late_update(self.unit, self.late_update.clone());
  }
}

impl Node {
  pub fn new(name: impl Into<String>) -> Self {
    Node {
      name: name.into(),
      active: true,
      scripts: Vec::new(),
      children: Vec::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn add_child(&mut self, child: Node) -> &mut Node {
    self.children.push(child);
    self.children.last_mut().unwrap()
  }

  pub fn children_mut(&mut self) -> &mut [Node] {
    &mut self.children
  }

  /// Attaches a script, wiring its capability hooks into the
  /// scheduler. Registration happens immediately when the node is
  /// active.
  pub fn attach<S>(&mut self, sched: &mut Scheduler, script: S) -> UnitId
  where
    S: Startable + Updatable + LateUpdatable + Destroyable + 'static,
  {
    let hook = Rc::new(RefCell::new(script));
    let unit = sched.create_unit();
    sched.set_destroy_hook(unit, hook.clone());

    let attached = Attached {
      unit,
      start: hook.clone(),
      update: hook.clone(),
      late_update: hook,
    };
    if self.active {
      attached.register(sched);
    }
    self.scripts.push(attached);
    unit
  }

  /// Cascades the activation state through the whole subtree.
  /// Disabling collects the subtree's units into a borrowed temp list
  /// first, so the unregister burst reuses one scratch allocation.
  pub fn set_active(&mut self, sched: &mut Scheduler, active: bool) {
    if self.active == active {
      return;
    }

    if active {
      self.register_subtree(sched);
    } else {
      let mut units = sched.borrow_temp_list();
      self.collect_subtree(&mut units, false);
      for &unit in &units {
        sched.deactivate_unit(unit);
      }
      sched.return_temp_list(units);
    }
  }

  /// Consumes the node, deactivating every unit in the subtree and
  /// queueing it for destruction. Teardown callbacks fire from the
  /// destroy flush, never from here.
  pub fn destroy(mut self, sched: &mut Scheduler) {
    let mut units = sched.borrow_temp_list();
    self.collect_subtree(&mut units, false);
    for &unit in &units {
      sched.deactivate_unit(unit);
      sched.enqueue_destroy(unit);
    }
    sched.return_temp_list(units);
  }

  fn register_subtree(&mut self, sched: &mut Scheduler) {
    self.active = true;
    for attached in &self.scripts {
      attached.register(sched);
    }
    for child in &mut self.children {
      child.register_subtree(sched);
    }
  }

  fn collect_subtree(&mut self, out: &mut Vec<UnitId>, active: bool) {
    self.active = active;
    for attached in &self.scripts {
      out.push(attached.unit);
    }
    for child in &mut self.children {
      child.collect_subtree(out, active);
    }
  }
}

#[cfg(test)]
mod test {
  use std::{cell::Cell, rc::Rc};

  use cadre_sched::{Destroyable, LateUpdatable, Scheduler, Startable, Updatable};

  use super::Node;

  #[derive(Default)]
  struct Probe {
    starts: Cell<u32>,
    updates: Cell<u32>,
    destroys: Cell<u32>,
  }

  struct Script {
    probe: Rc<Probe>,
  }

  impl Startable for Script {
    fn on_start(&mut self, _sched: &mut Scheduler) {
      self.probe.starts.set(self.probe.starts.get() + 1);
    }
  }

  impl Updatable for Script {
    fn on_update(&mut self, _sched: &mut Scheduler, _dt: f32) {
      self.probe.updates.set(self.probe.updates.get() + 1);
    }
  }

  impl LateUpdatable for Script {
    fn on_late_update(&mut self, _sched: &mut Scheduler, _dt: f32) {}
  }

  impl Destroyable for Script {
    fn on_destroy(&mut self, _sched: &mut Scheduler) {
      self.probe.destroys.set(self.probe.destroys.get() + 1);
    }
  }

  fn frame(sched: &mut Scheduler) {
    sched.run_on_start();
    sched.run_on_update(0.016);
    sched.run_on_late_update(0.016);
    sched.flush_destroys();
  }

  #[test]
  fn attached_script_starts_then_updates() {
    let mut sched = Scheduler::new();
    let probe = Rc::new(Probe::default());

    let mut node = Node::new("player");
    node.attach(&mut sched, Script { probe: probe.clone() });

    frame(&mut sched);
    assert_eq!(probe.starts.get(), 1);
    assert_eq!(probe.updates.get(), 1);
  }

  #[test]
  fn disable_cascades_through_children() {
    let mut sched = Scheduler::new();
    let probe = Rc::new(Probe::default());

    let mut root = Node::new("root");
    root.attach(&mut sched, Script { probe: probe.clone() });
    let child = root.add_child(Node::new("child"));
    child.attach(&mut sched, Script { probe: probe.clone() });

    frame(&mut sched);
    assert_eq!(probe.updates.get(), 2);

    root.set_active(&mut sched, false);
    assert!(!root.is_active());
    frame(&mut sched);
    assert_eq!(probe.updates.get(), 2);

    root.set_active(&mut sched, true);
    frame(&mut sched);
    assert_eq!(probe.updates.get(), 4);
    // both units had already started; re-enabling must not restart
    assert_eq!(probe.starts.get(), 2);
  }

  #[test]
  fn disable_before_start_keeps_the_start_pending() {
    let mut sched = Scheduler::new();
    let probe = Rc::new(Probe::default());

    let mut node = Node::new("latent");
    node.attach(&mut sched, Script { probe: probe.clone() });

    // never ran a frame: the unit has not started yet
    node.set_active(&mut sched, false);
    frame(&mut sched);
    assert_eq!(probe.starts.get(), 0);

    node.set_active(&mut sched, true);
    frame(&mut sched);
    assert_eq!(probe.starts.get(), 1);
    assert_eq!(probe.updates.get(), 1);
  }

  #[test]
  fn destroy_tears_down_the_subtree_next_frame() {
    let mut sched = Scheduler::new();
    let probe = Rc::new(Probe::default());

    let mut root = Node::new("doomed");
    root.attach(&mut sched, Script { probe: probe.clone() });
    let child = root.add_child(Node::new("child"));
    child.attach(&mut sched, Script { probe: probe.clone() });

    frame(&mut sched);
    root.destroy(&mut sched);

    frame(&mut sched);
    assert_eq!(probe.destroys.get(), 0);
    frame(&mut sched);
    assert_eq!(probe.destroys.get(), 2);
    assert_eq!(sched.live_units(), 0);
  }
}
