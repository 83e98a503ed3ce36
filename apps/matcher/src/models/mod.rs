pub mod evidence;
pub mod job;
pub mod matching;
pub mod preferences;
pub mod resume;

/// Fixed-dimension embedding vector as produced by the provider.
pub type Embedding = Vec<f32>;
