use clap::Parser;

use nestegg::api::{Cli, Command, init_tracing, run_http_server, run_project_command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Serve(args) => run_http_server(args.into()).await?,
        Command::Project(args) => println!("{}", run_project_command(&args)?),
    }
    Ok(())
}
