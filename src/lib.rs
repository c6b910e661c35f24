//! Playback core for moving-judgment-line rhythm charts.
//!
//! A chart is a set of judgment lines with eased motion tracks and notes
//! that scroll toward them. This crate evaluates line and note positions
//! over time, runs the timing-window judgment state machine for manual or
//! autoplay input, and accumulates the score. Parsing chart formats,
//! audio, and rendering live in the host application; the boundary is the
//! normalized [`chart::ChartDef`] intermediate on the way in and
//! positions, feedback events, and score snapshots on the way out.
//!
//! Typical flow:
//!
//! ```no_run
//! use linefall::chart::{build_runtime, ChartDef};
//! use linefall::config::{PlayConfig, RenderConfig};
//! use linefall::gameplay::{InputSample, Playback};
//!
//! # fn main() -> Result<(), linefall::chart::ChartError> {
//! let def = ChartDef::from_json_str(r#"{"bpm_events": [], "lines": []}"#)?;
//! let render = RenderConfig::new(1920.0, 1080.0);
//! let play = PlayConfig::default();
//! let chart = build_runtime(&def, &render, &play)?;
//! let mut session = Playback::new(chart, render, play);
//! session.tick(0.0, InputSample::default());
//! for event in session.drain_feedback() {
//!     // hand to the effects/audio layer
//!     let _ = event;
//! }
//! # Ok(())
//! # }
//! ```

pub mod chart;
pub mod clock;
pub mod config;
pub mod easing;
pub mod gameplay;
pub mod judgment;
pub mod kinematics;
pub mod scores;
pub mod timing;
pub mod tracks;
pub mod visibility;

pub use chart::{build_runtime, ChartDef, ChartError, NoteKind, RuntimeChart};
pub use clock::PlaybackClock;
pub use config::{LineAlphaRule, PlayConfig, RenderConfig};
pub use gameplay::{FeedbackEvent, FeedbackKind, InputSample, Playback};
pub use judgment::{Grade, JudgeWindows};
pub use scores::ScoreState;
