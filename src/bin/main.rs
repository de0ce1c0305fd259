#![cfg_attr(not(windows), allow(dead_code))]

use std::error::Error;

use tracing::info;
use tracing_subscriber::EnvFilter;

use svcreg::{
    cli::{Cli, Commands, parse_args},
    scm::ScmBackend,
    service::Service,
};

const GREEN_BOLD: &str = "\x1b[1;32m"; // Bright Green
const RED_BOLD: &str = "\x1b[1;31m"; // Bright Red
const RESET: &str = "\x1b[0m"; // Reset color

fn main() -> Result<(), Box<dyn Error>> {
    let args = parse_args();
    init_logging(&args);

    #[cfg(windows)]
    {
        dispatch(svcreg::scm::windows::WindowsScm::new(), args.command)
    }

    #[cfg(not(windows))]
    {
        let _ = args.command;
        Err("the service control manager is only available on Windows hosts".into())
    }
}

fn init_logging(args: &Cli) {
    let filter = if let Some(level) = args.log_level {
        EnvFilter::new(level.as_str())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn dispatch<B: ScmBackend>(backend: B, command: Commands) -> Result<(), Box<dyn Error>> {
    match command {
        Commands::Register {
            name,
            path,
            display_name,
        } => {
            let mut service = Service::with_backend(backend, name)?;
            match display_name {
                Some(display_name) => {
                    service.register_with_display_name(&path, &display_name)?
                }
                None => service.register(&path)?,
            }
            info!("Registered service '{}'", service.name());
        }
        Commands::Unregister { name } => {
            let mut service = Service::with_backend(backend, name)?;
            service.unregister()?;
            info!(
                "Unregistered service '{}'; the entry disappears once all handles close",
                service.name()
            );
        }
        Commands::Start { name } => {
            let mut service = Service::with_backend(backend, name)?;
            service.start()?;
            info!("Service '{}' is running", service.name());
        }
        Commands::Stop { name } => {
            let mut service = Service::with_backend(backend, name)?;
            service.stop()?;
            info!("Stop request for '{}' acknowledged", service.name());
        }
        Commands::Status { name, json } => {
            let mut service = Service::with_backend(backend, name)?;
            show_status(&mut service, json)?;
        }
        Commands::Startup { name, policy } => {
            let mut service = Service::with_backend(backend, name)?;
            match policy {
                Some(policy) => {
                    service.set_startup(policy)?;
                    info!("Service '{}' now set to {policy} start", service.name());
                }
                None => println!("{}", service.startup()?),
            }
        }
        Commands::Info { name } => {
            let mut service = Service::with_backend(backend, name)?;
            println!("Display name: {}", service.display_name()?);
            println!("        Path: {}", service.path()?);
        }
    }

    Ok(())
}

fn show_status<B: ScmBackend>(
    service: &mut Service<B>,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let name = service.name().to_string();

    if !service.is_registered() {
        if json {
            let payload = serde_json::json!({ "name": name, "registered": false });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        } else {
            println!("● {name} - Not registered");
        }
        return Ok(());
    }

    let running = service.is_running()?;
    let startup = service.startup()?;

    if json {
        let payload = serde_json::json!({
            "name": name,
            "registered": true,
            "running": running,
            "startup": startup,
            "display_name": service.display_name()?,
            "path": service.path()?,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if running {
        println!("{GREEN_BOLD}● {name} - Running{RESET} ({startup} start)");
    } else {
        println!("● {name} - {RED_BOLD}Not running{RESET} ({startup} start)");
    }

    Ok(())
}
