pub mod debugging;
pub mod utils;
