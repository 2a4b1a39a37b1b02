pub mod builder;
pub mod file;
pub mod radix;
pub mod table;
