//! `register`: create this server's record and store its credential.

use dialoguer::Input;
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use cloak_api::{Registration, Server};

use crate::cli::{GlobalOpts, RegisterArgs};
use crate::commands::info::server_detail;
use crate::commands::util::{self, prompt_err};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

pub async fn handle(
    args: RegisterArgs,
    session: &mut Session,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Some(existing) = session.config.credential() {
        let message = format!(
            "This host is already registered as {}. Register it again?",
            existing.server_id()
        );
        if !util::confirm(&message, args.yes)? {
            return Err(CliError::Validation {
                field: "register".into(),
                reason: "already registered (pass --yes to replace)".into(),
            });
        }
    }

    let email = match args.email {
        Some(email) => email,
        None => Input::<String>::new()
            .with_prompt("Email")
            .interact_text()
            .map_err(prompt_err)?,
    };
    let password = match args.password {
        Some(password) => SecretString::from(password),
        None => SecretString::from(rpassword::prompt_password("Password: ").map_err(prompt_err)?),
    };

    if email.is_empty() || password.expose_secret().is_empty() {
        return Err(CliError::Validation {
            field: "credentials".into(),
            reason: "email and password cannot be empty".into(),
        });
    }

    let client = session.client(global)?;

    let mut registration = Registration::new(&email, &password, &args.target);
    if let Some(ref name) = args.name {
        registration = registration.name(name);
    }
    if let Some(ref version) = args.api_version {
        registration = registration.api_version(version);
    }

    let server = Server::register(&client, &registration).await?;
    session.config.set_credential(server.credential());
    info!(server_id = server.server_id(), "credential stored");

    let out = output::render_single(global.output, &server, |server| {
        format!("Registered.\n\n{}", server_detail(server))
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
