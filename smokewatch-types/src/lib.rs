//! # smokewatch-types
//!
//! Core types for temperature stall detection. This crate has no I/O: it
//! decodes readings from queue payloads, keeps the sliding window of recent
//! readings and evaluates whether the temperature has stalled.
//!
//! ## Example
//!
//! ```rust
//! use smokewatch_types::{Reading, Window};
//!
//! let mut window = Window::new();
//!
//! for _ in 0..20 {
//!     let reading = Reading::decode(b"05/29/24 14:00:00, 150.2").unwrap();
//!     let state = window.observe(reading.temperature);
//!     if state.is_stalled() {
//!         println!("stalled at {}", reading.temperature);
//!     }
//! }
//!
//! assert!(window.is_full());
//! ```
//!
//! ## Stall rule
//!
//! Once the window holds [`WINDOW_CAPACITY`] readings, the difference between
//! the newest and oldest reading is rounded to one decimal place. A magnitude
//! of at most [`STALL_THRESHOLD`] degrees is a stall.

mod alert;
mod reading;
mod window;

pub use alert::*;
pub use reading::*;
pub use window::*;

/// Number of readings kept in the window.
///
/// The producer publishes one reading every 30 seconds, so a full window
/// spans ten minutes.
pub const WINDOW_CAPACITY: usize = 20;

/// Largest temperature change (in degrees, after rounding) that still counts
/// as a stall.
pub const STALL_THRESHOLD: f64 = 1.0;

/// Label of the item watched by the default consumer.
pub const MONITORED_ITEM: &str = "Food A";
