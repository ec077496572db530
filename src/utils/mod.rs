pub mod pdf;
pub mod terminal;
