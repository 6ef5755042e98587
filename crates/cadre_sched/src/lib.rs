pub mod pool;
pub mod scheduler;
pub mod set;
pub mod unit;

pub use pool::ListPool;
pub use scheduler::Scheduler;
pub use set::SlotList;
pub use unit::{
  AnimationUpdatable, Destroyable, Hook, LateUpdatable, PhysicsUpdatable, Renderable,
  RendererUpdatable, Stage, Startable, UnitId, Updatable,
};
