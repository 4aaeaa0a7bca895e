pub mod mining;
pub mod proto;
pub mod reader;
