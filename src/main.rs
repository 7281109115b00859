use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, Command};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use template_debug::{resolve_dotted, DebugSettings, DebugTags, RenderingContext, TagLibrary};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let variable = || {
        Arg::new("variable")
            .help("Context variable, optionally dotted (user.groups)")
            .required(true)
    };

    Command::new("template-debug")
        .about("Inspect the variables of a rendering context dump")
        .arg(
            Arg::new("context")
                .help("JSON file holding an array of context layers")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("settings")
                .long("settings")
                .value_name("FILE")
                .help("Settings JSON file (defaults to the user config directory)"),
        )
        .arg(
            Arg::new("root")
                .long("root")
                .value_name("PATH")
                .help("Prefix stripped from reported source paths"),
        )
        .arg(
            Arg::new("remote")
                .long("remote")
                .value_name("ADDR")
                .help("Address of the debugger remote_trace attaches to (host:port)"),
        )
        .arg(
            Arg::new("force")
                .long("force")
                .action(ArgAction::SetTrue)
                .help("Enable template debugging regardless of settings"),
        )
        .subcommand_required(true)
        .subcommand(Command::new("variables").about("List the variables visible in the context"))
        .subcommand(
            Command::new("attributes")
                .about("List the template-visible attributes of a variable")
                .arg(variable()),
        )
        .subcommand(
            Command::new("details")
                .about("Show a variable's attributes and their values")
                .arg(variable()),
        )
        .subcommand(
            Command::new("find")
                .about("Show where a callable variable is defined")
                .arg(variable()),
        )
        .subcommand(Command::new("set_trace").about("Open an interactive prompt over the context"))
        .subcommand(
            Command::new("remote_trace").about("Send the context to a listening remote debugger"),
        )
}

fn load_context(path: &Path) -> Result<RenderingContext> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read context from {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    RenderingContext::from_json(json).with_context(|| format!("Invalid context in {}", path.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();

    let settings_path = matches.get_one::<String>("settings").map(PathBuf::from);
    let mut settings = DebugSettings::load(settings_path.as_deref())?;
    if let Some(root) = matches.get_one::<String>("root") {
        settings.root_path = Some(PathBuf::from(root));
    }
    if let Some(remote) = matches.get_one::<String>("remote") {
        let address = remote
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid remote debugger address `{}`", remote))?;
        settings.remote_debugger = Some(address);
    }
    if matches.get_flag("force") {
        settings.template_debug = true;
    }
    if !settings.template_debug {
        tracing::warn!("Template debugging is off; pass --force or set TEMPLATE_DEBUG=1");
    }

    let context_path = matches
        .get_one::<String>("context")
        .context("Missing context file")?;
    let context = load_context(Path::new(context_path))?;

    let Some((command, sub)) = matches.subcommand() else {
        bail!("No command given");
    };

    let arg = match sub.try_get_one::<String>("variable").ok().flatten() {
        Some(path) => match resolve_dotted(|name| context.get(name), path) {
            Some(value) => Some(value),
            None => bail!("No variable named `{}` in the context", path),
        },
        None => None,
    };

    let mut tags = DebugTags::new(settings);
    let library = TagLibrary::with_debug_tags();
    if library.call(command, &mut tags, &context, arg.as_ref()).is_none() {
        bail!("Unknown tag `{}`", command);
    }

    Ok(())
}
