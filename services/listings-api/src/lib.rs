//! Real-time listings service
//!
//! Accepts listing submissions over HTTP, keeps them in memory, pushes each
//! new listing to every connected WebSocket subscriber and forwards a short
//! notice to Telegram.
//!
//! # Architecture
//!
//! ```text
//!  POST /listings
//!        │
//!   ┌────▼─────┐
//!   │ validate │  ← field-level 422 on bad input
//!   └────┬─────┘
//!   ┌────▼─────┐
//!   │  store   │  ← assigns id under lock
//!   └────┬─────┘
//!        ├───────────────┐
//!   ┌────▼─────┐    ┌────▼─────┐
//!   │ registry │    │  notify  │  ← spawned, time-bounded
//!   │ fan-out  │    └──────────┘
//!   └────┬─────┘
//!        │
//!   GET /ws subscribers
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod notify;
pub mod registry;
pub mod router;
pub mod state;
pub mod store;

// Service version
pub const SERVICE_VERSION: &str = "0.1.0";
