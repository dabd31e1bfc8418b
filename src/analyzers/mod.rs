pub mod key;
pub mod matcher;
pub mod title;
