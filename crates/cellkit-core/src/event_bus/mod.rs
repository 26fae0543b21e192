//! # Event Bus Module
//!
//! Carries editor events from the transaction engine to whatever plays the
//! role of the status line: the prompt area of a GUI, a log panel, or a test.
//!
//! ## Overview
//!
//! - Publishers emit typed [`EditorEvent`]s without knowing subscribers
//! - Subscribers filter by [`EventCategory`] and receive events synchronously
//! - An optional bounded history keeps recent events for late subscribers
//!
//! There is no global instance: the host creates one `EventBus`, wraps it in an
//! `Arc`, and hands clones to the engine and to its own UI.
//!
//! ## Usage
//!
//! ```rust
//! use cellkit_core::event_bus::{EditorEvent, EventBus, EventCategory, EventFilter, StatusEvent};
//!
//! let bus = EventBus::new();
//! let subscription = bus.subscribe(
//!     EventFilter::Categories(vec![EventCategory::Status]),
//!     |event| {
//!         if let EditorEvent::Status(status) = event {
//!             println!("{}", status.message());
//!         }
//!     },
//! );
//!
//! bus.publish(EditorEvent::Status(StatusEvent::NothingToUndo));
//! bus.unsubscribe(subscription);
//! ```

mod bus;
mod events;

pub use bus::*;
pub use events::*;
