pub mod normalizer;

pub use normalizer::{plan, validate, Normalizer};
