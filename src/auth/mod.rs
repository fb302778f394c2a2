pub mod bot_check;
pub mod login_attempts;
pub mod password;
pub mod session;
