//! CLI command implementations.

pub mod channels;
pub mod config;
pub mod listen;

use console::Term;
use dialoguer::{Input, Select};

use et_core::config::ConfigHandle;
use et_core::constants::roles;
use et_core::error::{EtError, EtResult};
use et_realtime::{Identity, Role};

use crate::IdentityArgs;

/// Resolve the identity to act as: flags, then config, then an interactive
/// prompt when attached to a terminal.
pub async fn resolve_identity(config: &ConfigHandle, args: IdentityArgs) -> EtResult<Identity> {
    let defaults = config.read().await.identity.clone();
    let interactive = Term::stdout().is_term();

    let user_id = match args.user.or(defaults.user_id) {
        Some(user) => user,
        None if interactive => Input::new()
            .with_prompt("User id")
            .interact_text()
            .map_err(|e| EtError::Internal(e.to_string()))?,
        None => return Err(EtError::MissingConfig("identity.user_id (or --user)".into())),
    };

    let role = match args.role.or(defaults.role) {
        Some(role) => role,
        None if interactive => {
            let picked = Select::new()
                .with_prompt("Role")
                .items(roles::ALL)
                .default(0)
                .interact()
                .map_err(|e| EtError::Internal(e.to_string()))?;
            roles::ALL[picked].to_string()
        }
        None => return Err(EtError::MissingConfig("identity.role (or --role)".into())),
    };

    let mut identity = Identity::new(user_id, Role::from_name(&role));
    if let Some(company) = args.company.or(defaults.company_id) {
        identity = identity.with_company(company);
    }
    Ok(identity)
}

/// Truncate a string to at most `max_chars` characters, appending an
/// ellipsis if truncated.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}
