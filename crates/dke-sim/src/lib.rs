//! dke-sim — Response sources and demo content.
//!
//! Provides the learners that drive an adaptive session outside of tests:
//! a seeded simulated student, a scripted replay, and an interactive console
//! learner, plus a reproducible demo item bank.

pub mod console;
pub mod demo;
pub mod scripted;
pub mod simulated;

pub use console::ConsoleResponder;
pub use demo::{demo_bank, DEMO_SKILLS};
pub use scripted::ScriptedResponder;
pub use simulated::SimulatedStudent;
