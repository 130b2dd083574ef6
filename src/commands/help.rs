use poise::builtins::HelpConfiguration;

use crate::commands::context::Context;
use crate::error::Result;

/// Show the list of available commands
#[poise::command(slash_command)]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Command to show help about"] command: Option<String>,
) -> Result<()> {
    let config = HelpConfiguration {
        extra_text_at_bottom: "Members join a giveaway by reacting with 🎉 to its announcement.",
        ephemeral: true,
        ..Default::default()
    };
    poise::builtins::help(ctx, command.as_deref(), config).await?;
    Ok(())
}
