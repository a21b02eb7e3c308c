//! # courier-whatsapp
//!
//! WhatsApp Cloud API integration: webhook payload types, the subscription
//! handshake, message-content extraction, and the outbound sender.

pub mod content;
pub mod events;
pub mod send;
pub mod verify;
