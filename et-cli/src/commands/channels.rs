//! Channels command: show the auto-subscribe plan for an identity.

use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};
use console::style;
use serde_json::json;

use et_core::config::ConfigHandle;
use et_core::error::EtResult;
use et_realtime::auto_subscribe::role_rules;
use et_realtime::{channels, subscription_plan, Identity};

use crate::{IdentityArgs, OutputFormat};

/// Where a planned channel comes from.
fn source_of(identity: &Identity, channel: &str) -> &'static str {
    if channel == channels::SYSTEM_ANNOUNCEMENTS {
        return "global";
    }
    let from_role = role_rules(&identity.role)
        .iter()
        .filter_map(|rule| rule(identity))
        .any(|c| c == channel);
    if from_role {
        "role"
    } else {
        "identity"
    }
}

pub async fn run(config: ConfigHandle, args: IdentityArgs, format: OutputFormat) -> EtResult<()> {
    let identity = super::resolve_identity(&config, args).await?;
    let plan = subscription_plan(&identity);

    match format {
        OutputFormat::Json => {
            let rows: Vec<_> = plan
                .iter()
                .map(|c| json!({ "channel": c, "source": source_of(&identity, c) }))
                .collect();
            println!(
                "{}",
                json!({ "identity": identity, "channels": rows })
            );
        }
        OutputFormat::Text => {
            println!(
                "  {} Subscriptions issued after authenticating as {}\n",
                style("PLAN").cyan().bold(),
                style(&identity).bold()
            );

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["#", "Channel", "Source"]);
            for (i, channel) in plan.iter().enumerate() {
                table.add_row(vec![
                    (i + 1).to_string(),
                    super::truncate(channel, 48),
                    source_of(&identity, channel).to_string(),
                ]);
            }
            println!("{table}");

            if role_rules(&identity.role).is_empty() {
                println!(
                    "\n  {} role '{}' has no role-specific channels",
                    style("NOTE").yellow(),
                    identity.role
                );
            }
        }
    }
    Ok(())
}
