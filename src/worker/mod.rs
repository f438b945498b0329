pub mod launcher;
pub mod process;
pub mod worker;
