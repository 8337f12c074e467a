mod engine;

pub use engine::{Projection, ProjectionEngine};
