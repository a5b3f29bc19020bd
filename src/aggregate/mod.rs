// src/aggregate/mod.rs
//
// Terminal folds over the filtered event stream. Each aggregator is a pure
// function of its input; none of them keep state across calls.

pub mod dashboard;
pub mod histogram;
pub mod log;
