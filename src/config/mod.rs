use thiserror::Error;

pub struct EngineConfig {
  /// Target frames per second for the paced loop.
  pub fps: u32,
  /// Registries are compacted every this many frames.
  pub gc_interval: u32,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      fps: 60,
      gc_interval: 8,
    }
  }
}

impl EngineConfig {
  pub(crate) fn validate(&self) -> Result<(), EngineError> {
    if self.fps == 0 {
      return Err(EngineError::InvalidFps);
    }
    if self.gc_interval == 0 {
      return Err(EngineError::InvalidGcInterval);
    }
    Ok(())
  }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EngineError {
  #[error("target fps must be non-zero")]
  InvalidFps,
  #[error("compaction interval must be non-zero")]
  InvalidGcInterval,
}

#[cfg(test)]
mod test {
  use super::{EngineConfig, EngineError};

  #[test]
  fn default_config_is_valid() {
    assert_eq!(EngineConfig::default().validate(), Ok(()));
  }

  #[test]
  fn zero_fps_is_rejected() {
    let config = EngineConfig {
      fps: 0,
      ..Default::default()
    };
    assert_eq!(config.validate(), Err(EngineError::InvalidFps));
  }

  #[test]
  fn zero_gc_interval_is_rejected() {
    let config = EngineConfig {
      gc_interval: 0,
      ..Default::default()
    };
    assert_eq!(config.validate(), Err(EngineError::InvalidGcInterval));
  }
}
