//! Terminal UI for playing Farkle locally.
//!
//! The UI owns one interactive program and redraws whatever state that
//! program publishes. Keys are mapped to program inputs; everything else
//! (help window, history scrolling) stays local to the UI.

pub mod tui_app;
