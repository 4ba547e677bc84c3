use clap::Parser;

use pipeplot::cli::{handle_config_action, Args, Command};

fn main() {
    // Load .env without overriding variables already set
    dotenv::dotenv().ok();

    let args = Args::parse();

    if let Err(e) = pipeplot::logging::init(args.log_file.as_deref()) {
        eprintln!("Error: cannot open log file: {}", e);
        std::process::exit(1);
    }

    if let Some(Command::Config { action }) = &args.command {
        if let Err(e) = handle_config_action(action, &args) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        return;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(pipeplot::session::run(&args));
    // A stdin read may still be parked on a blocking thread
    runtime.shutdown_background();

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
