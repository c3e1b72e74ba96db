mod email;
mod sms;
mod whatsapp;

pub use email::EmailNotifier;
pub use sms::SmsNotifier;
pub use whatsapp::WhatsAppNotifier;
