pub mod frequency;
pub mod history;
pub mod prize;
pub mod sampler;
pub mod snapshot;
pub mod transition;
