pub mod editor_client;

pub use editor_client::EditorClient;
