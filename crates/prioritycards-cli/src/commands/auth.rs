use clap::Subcommand;
use prioritycards_core::auth::{clear_session, KeyringSessionStore};
use prioritycards_core::{AuthOptions, AuthService, Config};

use super::{connect, current_session, runtime, CliResult};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Log in with a shared username and password
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show who is logged in
    Status,
}

pub fn run(action: AuthAction) -> CliResult {
    let config = Config::load()?;
    match action {
        AuthAction::Login { username, password } => {
            let remote = connect(&config)?;
            let mut auth =
                AuthService::init(remote, KeyringSessionStore::new(), AuthOptions::from(&config));
            runtime()?.block_on(auth.login(&username, &password))?;
            println!("logged in as {username}");
        }
        AuthAction::Logout => {
            // No backend needed; only the stored session is touched.
            clear_session(&KeyringSessionStore::new(), &config.auth.session_key)?;
            println!("logged out");
        }
        AuthAction::Status => match current_session(&config).and_then(|s| s.username) {
            Some(username) => println!("logged in as {username}"),
            None => println!("not logged in"),
        },
    }
    Ok(())
}
