//! Subcommand implementations.
//!
//! Output goes to the supplied writer; diagnostics go through `tracing`.

use crate::cli::{Cli, Command, ContextSizeArgs, GenerateArgs, ModelsArgs, RenderArgs};
use anyhow::{bail, Context as _, Result};
use context::{ContextManager, Role};
use futures::StreamExt;
use llm::{create_provider, GenerateOptions, LlmSettings, ProviderKind};
use prompt::{PromptTemplate, Variables};
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

/// Name used to look up `llmkit.yaml` / `llmkit.json`.
pub const APP_NAME: &str = "llmkit";

/// Completion budget held back from the context window when none is given.
const DEFAULT_RESPONSE_RESERVE: usize = 512;

/// Dispatch a parsed command line.
pub async fn run<W: Write + Send>(cli: Cli, out: &mut W) -> Result<()> {
    match cli.command {
        Command::Render(args) => render(&args, out),
        Command::Generate(args) => {
            let settings = load_settings(cli.config.as_deref())?;
            generate(&settings, &args, out).await
        }
        Command::Models(args) => {
            let settings = load_settings(cli.config.as_deref())?;
            models(&settings, &args, out).await
        }
        Command::ContextSize(args) => {
            let settings = load_settings(cli.config.as_deref())?;
            context_size(&settings, &args, out)
        }
    }
}

/// Settings from `path`, else a discovered `llmkit` settings file, with
/// anything the file leaves unset taken from the environment.
pub fn load_settings(path: Option<&Path>) -> Result<LlmSettings> {
    let discovered = path
        .map(Path::to_path_buf)
        .or_else(|| utils::config::find_config_file(APP_NAME));

    match discovered {
        Some(file) => {
            info!(path = %file.display(), "loading settings file");
            LlmSettings::from_file_with_env(&file)
                .with_context(|| format!("failed to load settings from {}", file.display()))
        }
        None => Ok(LlmSettings::from_env()),
    }
}

fn selected_kind(requested: Option<ProviderKind>, settings: &LlmSettings) -> ProviderKind {
    requested
        .or(settings.default_provider)
        .unwrap_or(ProviderKind::OpenAi)
}

fn variables(pairs: &[(String, Value)]) -> Variables {
    pairs.iter().cloned().collect()
}

/// `llmkit render`
pub fn render<W: Write>(args: &RenderArgs, out: &mut W) -> Result<()> {
    let template = PromptTemplate::from_file(&args.template)
        .with_context(|| format!("failed to read template {}", args.template.display()))?;
    let text = template.format(&variables(&args.vars))?;
    writeln!(out, "{}", text)?;
    Ok(())
}

/// `llmkit generate`
pub async fn generate<W: Write + Send>(
    settings: &LlmSettings,
    args: &GenerateArgs,
    out: &mut W,
) -> Result<()> {
    let prompt = match (&args.prompt, &args.template) {
        (Some(prompt), _) => prompt.clone(),
        (None, Some(path)) => PromptTemplate::from_file(path)
            .with_context(|| format!("failed to read template {}", path.display()))?
            .format(&variables(&args.vars))?,
        (None, None) => bail!("either a prompt or --template is required"),
    };

    let kind = selected_kind(args.provider, settings);
    let mut settings = settings.clone();
    if let Some(model) = &args.model {
        match kind {
            ProviderKind::OpenAi => settings.openai.model = Some(model.clone()),
            ProviderKind::Anthropic => settings.anthropic.model = Some(model.clone()),
            ProviderKind::HuggingFace => settings.huggingface.model = Some(model.clone()),
            ProviderKind::OnDevice => settings.local.model_file = model.clone(),
        }
    }

    let provider = create_provider(kind, &settings)?;
    let window = provider.model_context_size(None);
    let reserve = args.max_tokens.unwrap_or(DEFAULT_RESPONSE_RESERVE).min(window);

    let mut ctx = ContextManager::new(provider.clone(), window, reserve);
    if let Some(system) = &args.system {
        ctx.add_message(Role::System, system.clone(), None);
    }
    ctx.add_message(Role::User, prompt.clone(), None);
    if ctx.get_context(false).is_empty() {
        bail!(
            "prompt does not fit in the {} token context window of {}",
            window,
            provider.model()
        );
    }
    debug!(
        provider = %kind,
        model = provider.model(),
        prompt_tokens = ctx.get_token_count(),
        available = ctx.get_available_tokens(),
        "sending prompt"
    );

    let mut options = GenerateOptions::new().with_temperature(args.temperature);
    if let Some(max_tokens) = args.max_tokens {
        options = options.with_max_tokens(max_tokens);
    }
    if let Some(system) = &args.system {
        options = options.with_system_message(system.clone());
    }

    if args.stream {
        let mut stream = provider.generate_stream(&prompt, options).await?;
        let mut reply = String::new();
        while let Some(fragment) = stream.next().await {
            let fragment = fragment?;
            write!(out, "{}", fragment)?;
            out.flush()?;
            reply.push_str(&fragment);
        }
        writeln!(out)?;
        ctx.add_message(Role::Assistant, reply, None);
    } else {
        let response = provider.generate(&prompt, options).await?;
        writeln!(out, "{}", response.text)?;
        if args.usage {
            eprintln!(
                "model: {}  prompt: {}  completion: {}  total: {}",
                response.model,
                response.usage.prompt_tokens,
                response.usage.completion_tokens,
                response.usage.total_tokens
            );
        }
        ctx.add_message(Role::Assistant, response.text, None);
    }

    let usage = ctx.usage();
    if usage.is_critical() {
        warn!(used = usage.used, total = usage.total, "context window nearly full");
    } else if usage.is_approaching_limit() {
        info!(used = usage.used, total = usage.total, "context window filling up");
    }
    debug!(
        used = usage.used,
        percentage = usage.percentage,
        warning = ?usage.warning_level,
        "context after reply"
    );
    Ok(())
}

/// `llmkit models`
pub async fn models<W: Write + Send>(
    settings: &LlmSettings,
    args: &ModelsArgs,
    out: &mut W,
) -> Result<()> {
    let kind = selected_kind(args.provider, settings);
    let names = if args.offline {
        kind.registry().model_names()
    } else {
        create_provider(kind, settings)?.available_models().await?
    };

    for name in names {
        writeln!(out, "{}", name)?;
    }
    Ok(())
}

/// `llmkit context-size`
pub fn context_size<W: Write>(settings: &LlmSettings, args: &ContextSizeArgs, out: &mut W) -> Result<()> {
    let kind = selected_kind(args.provider, settings);
    let model = args.model.clone().unwrap_or_else(|| settings.model(kind));
    let size = kind.registry().context_size(&model);
    writeln!(out, "{}\t{}\t{}", kind, model, size)?;
    Ok(())
}
