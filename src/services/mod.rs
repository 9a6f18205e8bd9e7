pub mod dispatch;
pub mod interactions;
pub mod reply;
pub mod responder;
pub mod sheets;
pub mod whatsapp;
