pub mod content;
pub mod players;
