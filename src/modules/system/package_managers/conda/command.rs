//! Conda command line construction
//!
//! Every builder returns `[executable, subcommand, flags..., target]`. Channel
//! flags and extra arguments are spliced in right after the subcommand.

/// Index at which injected tokens land: after executable and subcommand.
const INJECTION_POINT: usize = 2;

const JSON_FLAG: &str = "--json";
const DRY_RUN_FLAG: &str = "--dry-run";
const YES_FLAG: &str = "--yes";
const CHANNEL_FLAG: &str = "--channel";

/// Dry-run install used to find out whether `target` is already satisfied.
pub fn query_command(executable: &str, target: &str) -> Vec<String> {
    vec![
        executable.to_string(),
        "install".to_string(),
        JSON_FLAG.to_string(),
        DRY_RUN_FLAG.to_string(),
        target.to_string(),
    ]
}

pub fn install_command(executable: &str, target: &str, dry_run: bool) -> Vec<String> {
    mutating_command(executable, "install", target, dry_run)
}

pub fn remove_command(executable: &str, name: &str, dry_run: bool) -> Vec<String> {
    mutating_command(executable, "remove", name, dry_run)
}

fn mutating_command(
    executable: &str,
    subcommand: &str,
    target: &str,
    dry_run: bool,
) -> Vec<String> {
    let mut command = vec![
        executable.to_string(),
        subcommand.to_string(),
        YES_FLAG.to_string(),
        JSON_FLAG.to_string(),
    ];
    if dry_run {
        command.push(DRY_RUN_FLAG.to_string());
    }
    command.push(target.to_string());
    command
}

/// Insert a `--channel <name>` pair per channel after the subcommand.
pub fn inject_channels(command: Vec<String>, channels: &[String]) -> Vec<String> {
    let flags = non_blank(channels)
        .flat_map(|channel| [CHANNEL_FLAG.to_string(), channel.to_string()])
        .collect();
    splice(command, flags)
}

/// Insert extra arguments verbatim after the subcommand.
pub fn inject_extra_args(command: Vec<String>, extra_args: &[String]) -> Vec<String> {
    let extras = non_blank(extra_args).map(str::to_string).collect();
    splice(command, extras)
}

/// Extras first, then channels, so channel flags sit next to the subcommand.
pub fn apply_injections(
    command: Vec<String>,
    channels: &[String],
    extra_args: &[String],
) -> Vec<String> {
    inject_channels(inject_extra_args(command, extra_args), channels)
}

/// Split a whitespace-delimited argument string into tokens.
pub fn split_words(input: &str) -> Vec<String> {
    input.split_whitespace().map(str::to_string).collect()
}

fn non_blank(tokens: &[String]) -> impl Iterator<Item = &str> {
    tokens.iter().map(|t| t.trim()).filter(|t| !t.is_empty())
}

fn splice(mut command: Vec<String>, tokens: Vec<String>) -> Vec<String> {
    if tokens.is_empty() {
        return command;
    }
    let at = INJECTION_POINT.min(command.len());
    command.splice(at..at, tokens);
    command
}
