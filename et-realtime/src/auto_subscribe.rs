//! Role-driven channel subscriptions issued after authentication.
//!
//! The plan is a pure function of the [`Identity`]: base rules every user
//! gets, then the rules for the user's role, then the system-wide topics.

use crate::channels;
use crate::identity::{Identity, Role};

/// Produces one channel name for an identity, or `None` when it does not apply.
pub type ChannelRule = fn(&Identity) -> Option<String>;

fn user_channel(id: &Identity) -> Option<String> {
    Some(channels::user(&id.user_id))
}

fn user_notifications_channel(id: &Identity) -> Option<String> {
    Some(channels::user_notifications(&id.user_id))
}

fn company_channel(id: &Identity) -> Option<String> {
    id.company_id.as_deref().map(channels::company)
}

fn company_fleet_channel(id: &Identity) -> Option<String> {
    id.company_id.as_deref().map(channels::company_fleet)
}

fn company_dispatch_channel(id: &Identity) -> Option<String> {
    id.company_id.as_deref().map(channels::company_dispatch)
}

fn own_driver_channel(id: &Identity) -> Option<String> {
    Some(channels::driver(&id.user_id))
}

fn drivers_alerts(_: &Identity) -> Option<String> {
    Some(channels::DRIVERS_ALERTS.to_string())
}

fn dispatch_updates(_: &Identity) -> Option<String> {
    Some(channels::DISPATCH_UPDATES.to_string())
}

fn compliance_alerts(_: &Identity) -> Option<String> {
    Some(channels::COMPLIANCE_ALERTS.to_string())
}

fn safety_alerts(_: &Identity) -> Option<String> {
    Some(channels::SAFETY_ALERTS.to_string())
}

fn marketplace(_: &Identity) -> Option<String> {
    Some(channels::MARKETPLACE.to_string())
}

fn escort_jobs(_: &Identity) -> Option<String> {
    Some(channels::ESCORT_JOBS.to_string())
}

fn terminals_alerts(_: &Identity) -> Option<String> {
    Some(channels::TERMINALS_ALERTS.to_string())
}

fn admin_alerts(_: &Identity) -> Option<String> {
    Some(channels::ADMIN_ALERTS.to_string())
}

fn system_announcements(_: &Identity) -> Option<String> {
    Some(channels::SYSTEM_ANNOUNCEMENTS.to_string())
}

/// Channels every authenticated user receives, before role rules.
const BASE_RULES: &[ChannelRule] = &[
    user_channel,
    user_notifications_channel,
    company_channel,
    company_fleet_channel,
    company_dispatch_channel,
];

/// Channels every authenticated user receives, after role rules.
const GLOBAL_RULES: &[ChannelRule] = &[system_announcements];

/// Role-specific channels, one row per role.
pub const ROLE_TABLE: &[(Role, &[ChannelRule])] = &[
    (Role::Shipper, &[marketplace]),
    (Role::Carrier, &[marketplace]),
    (Role::Broker, &[marketplace]),
    (Role::Driver, &[drivers_alerts, own_driver_channel]),
    (Role::Dispatch, &[dispatch_updates]),
    (Role::Escort, &[escort_jobs]),
    (Role::TerminalManager, &[terminals_alerts]),
    (Role::ComplianceOfficer, &[compliance_alerts]),
    (Role::SafetyManager, &[safety_alerts]),
    (Role::Admin, &[admin_alerts]),
    (Role::SuperAdmin, &[admin_alerts]),
];

/// Rules that apply to a role. Unknown roles get none.
pub fn role_rules(role: &Role) -> &'static [ChannelRule] {
    ROLE_TABLE
        .iter()
        .find(|(r, _)| r == role)
        .map(|(_, rules)| *rules)
        .unwrap_or(&[])
}

/// Ordered, duplicate-free list of channels to subscribe for an identity.
pub fn subscription_plan(identity: &Identity) -> Vec<String> {
    let mut plan: Vec<String> = Vec::new();
    let rules = BASE_RULES
        .iter()
        .chain(role_rules(&identity.role))
        .chain(GLOBAL_RULES);

    for rule in rules {
        if let Some(channel) = rule(identity) {
            if !plan.contains(&channel) {
                plan.push(channel);
            }
        }
    }
    plan
}
