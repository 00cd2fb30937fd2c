pub mod sdk;
pub mod evaluator;
pub mod perf;
pub mod sequencer;
pub mod timeline;
