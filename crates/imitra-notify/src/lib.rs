//! Notification plumbing: who hears about an event, live push to connected
//! clients, and outbound email/SMS.

mod fanout;
mod gateway;
mod hub;
pub mod message;

pub use fanout::{Delivery, fan_out};
pub use gateway::{Gateway, GatewayError};
pub use hub::{Envelope, Hub, Subscription};
