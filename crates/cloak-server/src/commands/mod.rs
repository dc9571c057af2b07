//! Command dispatch: bridges CLI args -> server API calls -> output formatting.

pub mod config_cmd;
pub mod info;
pub mod pki;
pub mod register;
pub mod req;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::config::Session;
use crate::error::CliError;

/// Dispatch a server API command to its handler.
pub async fn dispatch(
    cmd: Command,
    session: &mut Session,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Register(args) => register::handle(args, session, global).await,
        Command::Info => info::handle(session, global).await,
        Command::Req(args) => req::handle(&args, session, global).await,
        Command::Pki(args) => pki::handle(&args, session, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
