//! ppsgui: aggregated contact events to GUI contact lists.
//!
//! Reads pre-aggregated tactile and peripersonal-space events, converts each
//! record into a contact with a gain-scaled force, and republishes the
//! combined list at a fixed rate for visualization.
//!
//! See `DESIGN.md` for architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod bottle;
pub mod config;
pub mod contact;
pub mod logging;
pub mod net;
pub mod skin;
