//! assetpipe CLI entry point.
//!
//! Parses arguments, sets up logging and colors, then dispatches to the
//! command implementations.

use assetpipe_cli::{cli, commands, error, logger, ui};
use clap::Parser;
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    if args.no_color {
        ui::disable_colors();
    } else {
        ui::init_colors();
    }

    let project = &args.project;
    let result = match args.command {
        cli::Command::Build => commands::build_execute(project).await,
        cli::Command::Dev(dev_args) => commands::dev_execute(project, dev_args).await,
        cli::Command::Extract => commands::extract_execute(project).await,
        cli::Command::InitTailwind => commands::init_tailwind_execute(project).await,
        cli::Command::Livereload(lr_args) => commands::livereload_execute(project, lr_args).await,
        cli::Command::ConvertMetafile(meta_args) => {
            commands::convert_metafile_execute(project, meta_args).await
        }
        cli::Command::GenerateEsbuildScript(gen_args) => {
            commands::generate_esbuild_script_execute(project, gen_args).await
        }
        cli::Command::EsbuildScript(script_args) => {
            commands::esbuild_script_execute(project, script_args).await
        }
        cli::Command::Tags(tags_args) => commands::tags_execute(project, tags_args).await,
        cli::Command::Render(render_args) => commands::render_execute(project, render_args).await,
    };

    result.map_err(error::cli_error_to_miette)
}
