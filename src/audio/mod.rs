pub mod convert;
pub mod decoder;
pub mod scanner;
