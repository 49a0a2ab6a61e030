pub mod to_tensor;
pub mod trainable;

pub use to_tensor::ToTensor;
pub use trainable::TrainingMetrics;
