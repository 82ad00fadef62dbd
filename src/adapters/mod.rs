// Concrete implementations of the domain ports over HTTP.

pub mod backend;
pub mod chat;

pub use backend::BackendClient;
pub use chat::HttpChatClient;
