/// Monthly photo competition server.
#[derive(clap::Parser, Debug)]
#[command(version, about, long_about = None)]
pub(crate) struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(clap::Subcommand, Debug, Default)]
pub(crate) enum Command {
    /// Runs the server (default)
    #[default]
    Run,
    /// Drops every table in the database
    Reset,
    /// Migrates the database to the latest schema
    Migrate,
    /// Creates local development accounts with session tokens
    Seed,
}
