pub mod command_handler;
pub mod handlers;
pub mod streak_commands;
