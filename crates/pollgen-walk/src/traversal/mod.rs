pub mod engine;
pub mod rng;
pub mod runner;
pub mod selector;
pub mod trace;
