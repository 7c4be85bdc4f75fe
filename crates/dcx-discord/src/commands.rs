//! Slash command definitions.

use serenity::builder::{CreateCommand, CreateCommandOption};
use serenity::model::application::CommandOptionType;

pub const EXPORT: &str = "export";
pub const PING: &str = "ping";

/// All slash commands this bot registers.
pub fn create_commands(default_limit: u8) -> Vec<CreateCommand> {
    vec![
        CreateCommand::new(EXPORT)
            .description("Export recent messages of this channel to a file")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "format",
                    "Output format (defaults to html)",
                )
                .add_string_choice("HTML", "html")
                .add_string_choice("Plain text", "txt")
                .add_string_choice("JSON", "json")
                .add_string_choice("CSV", "csv")
                .required(false),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Integer,
                    "limit",
                    format!("How many messages to export (default {default_limit}, max 100)"),
                )
                .min_int_value(1)
                .max_int_value(100)
                .required(false),
            ),
        CreateCommand::new(PING).description("Check that the bot is alive"),
    ]
}
