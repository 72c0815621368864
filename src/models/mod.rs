pub mod editor;
pub mod error;
pub mod member;
pub mod messages;
pub mod scope;

pub use editor::*;
pub use error::*;
pub use member::*;
pub use messages::*;
pub use scope::*;
