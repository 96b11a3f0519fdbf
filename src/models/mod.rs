pub mod enums;
pub mod member;
pub mod medication;
pub mod appointment;

pub use member::*;
pub use medication::*;
pub use appointment::*;
