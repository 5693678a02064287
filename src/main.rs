use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use farmstage::prelude::*;
use farmstage::{serve, stage};

/// Converts Farmdown updates to HTML and stages the static site
#[derive(Parser, Debug)]
#[command(name = "farmstage", version, about, long_about = None)]
struct Cli {
    /// Repository root the default paths are resolved against
    #[arg(long, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert Updates.md to an HTML snippet
    Updates {
        /// Path to the Markdown updates file
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Destination HTML snippet
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Create a site build under Stage/Builds
    Build(BuildArgs),

    /// Build, then serve the result over HTTP
    #[command(alias = "webserver")]
    Serve {
        #[command(flatten)]
        build: BuildArgs,

        /// Port for the local HTTP server
        #[arg(long, default_value_t = 4173)]
        port: u16,
    },
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Name of the build folder under Stage/Builds
    #[arg(long, default_value = "local")]
    name: String,

    /// Skip compiling the WebAssembly site with Emscripten
    #[arg(long)]
    skip_wasm: bool,

    /// Leave out web source files matching this wildcard
    #[arg(long, value_name = "GLOB")]
    exclude: Vec<String>,
}

fn build(layout: Layout, args: &BuildArgs) -> Result<PathBuf> {
    let mut stager = args
        .exclude
        .iter()
        .fold(Stager::new(layout), |stager, pattern| stager.exclude(pattern.as_str()));

    if !args.skip_wasm {
        let compiler = Emscripten::locate(&stager.layout().em_cache)?;
        stager = stager.compiler(compiler);
    }

    stager.build(&args.name)
}

#[actix_web::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let layout = Layout::new(cli.root);

    match cli.command {
        Command::Updates { input, output } => {
            stage::run_updates(
                &input.unwrap_or_else(|| layout.updates_input.clone()),
                &output.unwrap_or_else(|| layout.updates_output.clone()),
            )?;
        }
        Command::Build(args) => {
            build(layout, &args)?;
        }
        Command::Serve { build: args, port } => {
            let build_dir = build(layout, &args)?;
            serve::serve(build_dir, port).await?;
        }
    }

    Ok(())
}
