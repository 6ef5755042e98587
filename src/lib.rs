pub mod config;
pub mod engine;
pub mod scene;

pub use cadre_sched;
pub use config::{EngineConfig, EngineError};
pub use engine::{Cadre, CadreBuilder, FrameHooks};
