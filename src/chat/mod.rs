pub mod engine;
pub mod store;

pub use engine::{ChatEngine, SessionSnapshot, SessionsOverview, SharedChatEngine};
pub use store::ChatError;
