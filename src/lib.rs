//! Hold-confirmed hand pose matching.
//!
//! Independent per-pose detectors report activation per hand; the
//! [`session::GestureSessionController`] aggregates those signals, debounces
//! them into a single confirmed match and pushes the currently wanted pose
//! into every detector.

pub mod config;
pub mod counter;
pub mod detector;
pub mod error;
pub mod hold;
pub mod injector;
pub mod learn;
pub mod library;
pub mod logging;
pub mod pipeline;
pub mod pose;
pub mod session;
pub mod signal;
pub mod sim;
