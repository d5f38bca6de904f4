//! Command-line arguments.

use clap::{Args, Parser, Subcommand};
use llm::ProviderKind;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "llmkit")]
#[command(about = "Render prompts and call text-generation backends", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Settings file (.yaml, .yml or .json). Defaults to ./llmkit.yaml or the
    /// user config directory, then the environment.
    #[arg(short, long, global = true, env = "LLMKIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render a template file to stdout
    Render(RenderArgs),

    /// Send one prompt and print the reply
    Generate(GenerateArgs),

    /// List models a backend can serve
    Models(ModelsArgs),

    /// Show a model's context window
    ContextSize(ContextSizeArgs),
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Template file
    pub template: PathBuf,

    /// Template variable; values that parse as JSON are used as JSON
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, Value)>,
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Prompt text (omit when using --template)
    pub prompt: Option<String>,

    /// Render the prompt from this template file
    #[arg(short, long, conflicts_with = "prompt")]
    pub template: Option<PathBuf>,

    /// Template variable; values that parse as JSON are used as JSON
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, Value)>,

    #[arg(short, long)]
    pub provider: Option<ProviderKind>,

    /// Model override
    #[arg(short, long)]
    pub model: Option<String>,

    /// Standing instruction for the model
    #[arg(short, long)]
    pub system: Option<String>,

    #[arg(long)]
    pub max_tokens: Option<usize>,

    #[arg(long, default_value_t = llm::DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    /// Print fragments as they arrive
    #[arg(long)]
    pub stream: bool,

    /// Print token usage to stderr after the reply
    #[arg(long)]
    pub usage: bool,
}

#[derive(Debug, Args)]
pub struct ModelsArgs {
    #[arg(short, long)]
    pub provider: Option<ProviderKind>,

    /// List the built-in context-size table instead of asking the backend
    #[arg(long)]
    pub offline: bool,
}

#[derive(Debug, Args)]
pub struct ContextSizeArgs {
    #[arg(short, long)]
    pub provider: Option<ProviderKind>,

    /// Model to look up (defaults to the configured model)
    pub model: Option<String>,
}

/// Parse `KEY=VALUE`. The value is read as JSON when it parses, otherwise
/// kept as a string.
pub fn parse_var(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty variable name in '{}'", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_var() {
        assert_eq!(parse_var("name=Ada").unwrap(), ("name".to_string(), json!("Ada")));
        assert_eq!(parse_var("verbose=false").unwrap().1, json!(false));
        assert_eq!(parse_var("n=3").unwrap().1, json!(3));
        assert_eq!(parse_var("tags=[\"a\"]").unwrap().1, json!(["a"]));
        assert_eq!(parse_var("eq=a=b").unwrap().1, json!("a=b"));
        assert_eq!(parse_var("empty=").unwrap().1, json!(""));
        assert!(parse_var("novalue").is_err());
        assert!(parse_var("=x").is_err());
    }

    #[test]
    fn test_parse_generate() {
        let cli = Cli::try_parse_from([
            "llmkit",
            "generate",
            "Hello there",
            "--provider",
            "claude",
            "--max-tokens",
            "64",
            "--stream",
        ])
        .unwrap();

        match cli.command {
            Command::Generate(args) => {
                assert_eq!(args.prompt.as_deref(), Some("Hello there"));
                assert_eq!(args.provider, Some(ProviderKind::Anthropic));
                assert_eq!(args.max_tokens, Some(64));
                assert_eq!(args.temperature, 0.7);
                assert!(args.stream);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_render_vars() {
        let cli = Cli::try_parse_from([
            "llmkit",
            "render",
            "prompt.txt",
            "--var",
            "a=1",
            "--var",
            "b=two",
        ])
        .unwrap();

        match cli.command {
            Command::Render(args) => {
                assert_eq!(args.template, PathBuf::from("prompt.txt"));
                assert_eq!(args.vars.len(), 2);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_provider() {
        assert!(Cli::try_parse_from(["llmkit", "models", "--provider", "bard"]).is_err());
    }

    #[test]
    fn test_prompt_conflicts_with_template() {
        assert!(Cli::try_parse_from(["llmkit", "generate", "hi", "--template", "t.txt"]).is_err());
    }
}
