mod cli;
mod input;
mod paths;
mod run;

use anyhow::Result;
use cli::{Command, LogAction};
use paths::AppPaths;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    let settings = cli.settings.as_deref();
    match cli.command {
        Command::Log(log_cmd) => match log_cmd.action {
            LogAction::Check { file, prune } => run::log_check(&file, prune),
        },
        Command::Build(args) => run::build(&AppPaths::discover(settings)?, args),
        Command::Analyze(args) => run::analyze(&AppPaths::discover(settings)?, args),
        Command::Resolve(args) => run::resolve(&AppPaths::discover(settings)?, args),
        Command::Where => run::describe(&AppPaths::discover(settings)?),
    }
}
