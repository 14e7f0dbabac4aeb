pub mod input;
pub mod table;
