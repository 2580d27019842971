//! # Messages
//!
//! Default reply bodies sent back to the texter, and fixed response payloads.

pub const OPT_OUT_REPLY: &str = "Has sido dado de baja de los mensajes de Citrino Courier. 🟢 Gracias.";
pub const OPT_IN_REPLY: &str = "Has sido dado de alta nuevamente. ✅";
pub const HELP_REPLY: &str = "Ayuda: Responde STOP para salir, START para volver a entrar.";
pub const MESSAGE_REPLY: &str = "Recibido. Gracias.";

pub const SERVICE_NAME: &str = "citrino-optout-webhook";

pub const INVALID_SIGNATURE: &str = "Invalid webhook signature";
pub const MISSING_FROM: &str = "Missing required form field: From";
