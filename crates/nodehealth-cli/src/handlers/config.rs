use crate::args::ConfigCommand;
use crate::context::ExecutionContext;
use anyhow::{Context, Result, bail};
use nodehealth_runtime::Config;

pub fn handle(ctx: &ExecutionContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let content =
                toml::to_string_pretty(&ctx.config).context("rendering configuration")?;
            print!("{}", content);
        }
        ConfigCommand::Init { force } => {
            let path = &ctx.config_path;
            if path.exists() && !force {
                bail!(
                    "{} already exists; pass --force to overwrite it",
                    path.display()
                );
            }
            Config::default().save_to(path)?;
            println!("Wrote {}", path.display());
        }
        ConfigCommand::Path => println!("{}", ctx.config_path.display()),
    }
    Ok(())
}
