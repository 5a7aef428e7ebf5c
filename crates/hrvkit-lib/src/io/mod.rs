pub mod beats;
pub mod table;
