pub mod alert;
pub mod channel;
pub mod error;
pub mod evaluation;
pub mod events;
pub mod ids;
pub mod notification;
pub mod product;
pub mod rule;
pub mod settings;
