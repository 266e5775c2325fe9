pub mod countdown_mode;
pub mod time_calculator;
