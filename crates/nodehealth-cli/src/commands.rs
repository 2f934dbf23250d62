use super::args::{Cli, Commands};
use super::context::ExecutionContext;
use super::handlers;
use super::logging;
use anyhow::Result;
use nodehealth_runtime::{Config, resolve_config_path};
use tracing::debug;

/// Run one command and return the process exit status.
pub fn run(cli: Cli) -> Result<i32> {
    let _guard = logging::init(cli.log_level, cli.log_file.as_deref())?;

    let config_path = resolve_config_path(cli.config.as_deref())?;
    let mut config = Config::load_from(&config_path)?;
    if let Some(dir) = cli.output_dir {
        config.report.output_dir = dir;
    }
    debug!(config = %config_path.display(), "loaded configuration");

    let mut ctx = ExecutionContext::new(config, config_path, cli.format, cli.fail_on_issues);

    let failed = match cli.command {
        Commands::Link {
            interfaces,
            thresholds,
            from_dir,
            address,
            date_stamp,
            previous,
            errors_only,
            failures_first,
            save_raw,
        } => {
            interfaces.apply(&mut ctx.config.link);
            thresholds.apply(&mut ctx.config.link);
            handlers::link::handle(
                &ctx,
                handlers::link::LinkOptions {
                    from_dir,
                    address,
                    date_stamp,
                    previous,
                    errors_only,
                    failures_first,
                    save_raw,
                },
            )?
        }

        Commands::Snapshot { interfaces } => {
            interfaces.apply(&mut ctx.config.link);
            handlers::snapshot::handle(&ctx)?;
            false
        }

        Commands::Gpu {
            bandwidth,
            iterations,
            bandwidth_binary,
            burn,
            burn_dir,
            burn_seconds,
            remap_limit,
            date_stamp,
        } => {
            let gpu = &mut ctx.config.gpu;
            gpu.bandwidth |= bandwidth;
            if let Some(iterations) = iterations {
                gpu.bandwidth_iterations = iterations;
            }
            if let Some(binary) = bandwidth_binary {
                gpu.bandwidth_binary = binary;
            }
            gpu.burn |= burn;
            if let Some(dir) = burn_dir {
                gpu.burn_dir = dir;
            }
            if let Some(seconds) = burn_seconds {
                gpu.burn_seconds = seconds;
            }
            if let Some(limit) = remap_limit {
                gpu.thresholds.remap_uncorrectable_limit = limit;
            }
            handlers::gpu::handle(&ctx, date_stamp)?
        }

        Commands::Diff {
            previous,
            current,
            date_stamp,
        } => handlers::diff::handle(&ctx, &previous, &current, date_stamp)?,

        Commands::Fleet {
            hostfile,
            hosts,
            user,
            port,
            identity,
            remote_dir,
            executable,
            concurrency,
            date_stamp,
            remote_args,
        } => {
            let fleet = &mut ctx.config.fleet;
            if user.is_some() {
                fleet.user = user;
            }
            if port.is_some() {
                fleet.port = port;
            }
            if identity.is_some() {
                fleet.identity_file = identity;
            }
            if let Some(dir) = remote_dir {
                fleet.remote_dir = dir;
            }
            if let Some(concurrency) = concurrency {
                fleet.concurrency = concurrency;
            }
            handlers::fleet::handle(
                &ctx,
                handlers::fleet::FleetOptions {
                    hostfile,
                    hosts,
                    executable,
                    date_stamp,
                    remote_args,
                },
            )?
        }

        Commands::RailLatency {
            client,
            server,
            shape,
            cutoff,
            osu_dir,
        } => {
            let fabric = &mut ctx.config.fabric;
            if let Some(cutoff) = cutoff {
                fabric.latency_cutoff_us = cutoff;
            }
            if osu_dir.is_some() {
                fabric.osu_dir = osu_dir;
            }
            let shape = shape.map(Into::into).unwrap_or(ctx.config.link.shape);
            handlers::rail_latency::handle(&ctx, shape, &client, &server)?
        }

        Commands::Rttcc { interfaces } => {
            interfaces.apply(&mut ctx.config.link);
            handlers::rttcc::handle(&ctx)?
        }

        Commands::Mapping => handlers::mapping::handle(&ctx)?,

        Commands::DecodeIpv6 { addresses } => handlers::decode_ipv6::handle(&ctx, &addresses)?,

        Commands::Renumber { shape, interfaces } => {
            handlers::renumber::handle(&ctx, shape.into(), &interfaces)?
        }

        Commands::Config { command } => {
            handlers::config::handle(&ctx, command)?;
            false
        }
    };

    Ok(ctx.exit_code(failed))
}
