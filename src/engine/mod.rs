// Elimination engine: split selection and the guessing-game session.

pub mod question;
pub mod session;
