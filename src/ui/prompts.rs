use anyhow::{Context, Result};
use dialoguer::Select;
use is_terminal::IsTerminal;

/// Interactive confirmation prompt using arrow-key navigable selection
///
/// # Arguments
/// * `prompt` - The question to ask the user
/// * `default_yes` - Whether "Yes" should be the default selection (index 0)
///
/// # Returns
/// * `Ok(true)` if user selects "Yes"
/// * `Ok(false)` if user selects "No"
pub fn prompt_confirmation(prompt: &str, default_yes: bool) -> Result<bool> {
    let items = ["Yes", "No"];
    let default_index = if default_yes { 0 } else { 1 };

    let selection = Select::new()
        .with_prompt(prompt)
        .items(&items)
        .default(default_index)
        .interact()?;

    Ok(selection == 0)
}

/// Confirm a destructive action. Without a terminal there is nobody to ask,
/// so the caller must pass `--yes` instead.
pub fn confirm_destructive(prompt: &str) -> Result<bool> {
    if !std::io::stdin().is_terminal() {
        anyhow::bail!("Refusing to continue without confirmation; pass --yes in non-interactive use");
    }
    prompt_confirmation(prompt, false)
}

/// Read a token without echoing it
pub fn prompt_token() -> Result<String> {
    let token = rpassword::prompt_password("GitHub token: ").context("Failed to read token")?;
    let token = token.trim().to_string();
    if token.is_empty() {
        anyhow::bail!("No token entered");
    }
    Ok(token)
}
