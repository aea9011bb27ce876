pub mod encoder;
pub mod error;
pub mod generator;
pub mod hash;
pub mod settings;

pub use encoder::encode;
pub use error::{PwmError, Result};
pub use generator::{derive, generate_password, DerivationRequest, FULL_CHARSET, MAX_ITERATIONS};
pub use hash::{available_algorithms, hash, Algorithm};
pub use settings::{Settings, SettingsStore};
