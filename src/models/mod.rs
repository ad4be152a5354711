//! Model artifacts, scoring and the startup registry

pub mod artifact;
pub mod loader;
pub mod registry;
pub mod scorer;
pub mod variant;

pub use loader::ModelLoader;
pub use registry::{compute_accuracy, score_one, ModelHandle, ModelRegistry, RegisteredModel};
pub use scorer::{OutputKind, Scorer};
pub use variant::Variant;
