use std::{cell::RefCell, rc::Rc};

use cadre_sched::{Scheduler, SlotList};

/// Per-camera bracketing around the draw traversal. Hooks may mutate
/// the scheduler, so removal of the hook's own unit mid-pass is fine.
pub trait RenderHook {
  fn on_begin_render(&mut self, _sched: &mut Scheduler) {}

  fn on_end_render(&mut self, _sched: &mut Scheduler) {}
}

pub struct Camera {
  name: String,
  hooks: SlotList<Rc<RefCell<dyn RenderHook>>>,
}

impl Camera {
  pub fn new(name: impl Into<String>) -> Self {
    Camera {
      name: name.into(),
      hooks: SlotList::default(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn add_hook(&mut self, hook: Rc<RefCell<dyn RenderHook>>) -> usize {
    self.hooks.add(hook)
  }

  /// Removes the hook at `index`. Returns the hook that was swapped
  /// into the vacated slot, if any, so callers caching indices can
  /// repair them.
  pub fn remove_hook(&mut self, index: usize) -> Option<Rc<RefCell<dyn RenderHook>>> {
    self.hooks.delete_by_index(index).cloned()
  }

  /// Begin hooks, renderer draws, then end hooks. The hook passes run
  /// newest-first so additions mid-pass wait until the next render.
  pub fn render(&mut self, sched: &mut Scheduler) {
    self.hooks.begin_loop();
    for i in (0..self.hooks.len()).rev() {
      let Some(hook) = self.hooks.get(i) else {
        continue;
      };
      let hook = hook.clone();
      hook.borrow_mut().on_begin_render(sched);
    }

    sched.visit_renderers(|_, renderable| renderable.draw());

    for i in (0..self.hooks.len()).rev() {
      let Some(hook) = self.hooks.get(i) else {
        continue;
      };
      let hook = hook.clone();
      hook.borrow_mut().on_end_render(sched);
    }
    self.hooks.end_loop();
  }
}

#[cfg(test)]
mod test {
  use std::{cell::RefCell, rc::Rc};

  use cadre_sched::{Renderable, Scheduler};

  use super::{Camera, RenderHook};

  type Log = Rc<RefCell<Vec<&'static str>>>;

  struct Bracket {
    log: Log,
  }

  impl RenderHook for Bracket {
    fn on_begin_render(&mut self, _sched: &mut Scheduler) {
      self.log.borrow_mut().push("begin");
    }

    fn on_end_render(&mut self, _sched: &mut Scheduler) {
      self.log.borrow_mut().push("end");
    }
  }

  struct Mesh {
    log: Log,
  }

  impl Renderable for Mesh {
    fn draw(&mut self) {
      self.log.borrow_mut().push("draw");
    }
  }

  #[test]
  fn render_brackets_the_draw_traversal() {
    let mut sched = Scheduler::new();
    let log: Log = Rc::new(RefCell::new(Vec::new()));

    let id = sched.create_unit();
    sched.register_renderer(id, Rc::new(RefCell::new(Mesh { log: log.clone() })));

    let mut camera = Camera::new("main");
    camera.add_hook(Rc::new(RefCell::new(Bracket { log: log.clone() })));

    camera.render(&mut sched);
    assert_eq!(*log.borrow(), vec!["begin", "draw", "end"]);
  }

  #[test]
  fn removed_hook_no_longer_fires() {
    let mut sched = Scheduler::new();
    let log: Log = Rc::new(RefCell::new(Vec::new()));

    let mut camera = Camera::new("main");
    let slot = camera.add_hook(Rc::new(RefCell::new(Bracket { log: log.clone() })));
    camera.remove_hook(slot);

    camera.render(&mut sched);
    assert!(log.borrow().is_empty());
  }
}
