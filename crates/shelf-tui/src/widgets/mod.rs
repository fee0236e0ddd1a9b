pub mod filter_input;
pub mod status_bar;
pub mod toast;
