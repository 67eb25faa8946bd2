//! Channel name constructors.
//!
//! Client and server must agree on these strings exactly, so every scope has
//! one constructor and nothing else formats channel names by hand.

pub const SYSTEM_ANNOUNCEMENTS: &str = "system:announcements";
pub const MARKETPLACE: &str = "marketplace";
pub const DRIVERS_ALERTS: &str = "drivers:alerts";
pub const DISPATCH_UPDATES: &str = "dispatch:updates";
pub const COMPLIANCE_ALERTS: &str = "compliance:alerts";
pub const SAFETY_ALERTS: &str = "safety:alerts";
pub const ESCORT_JOBS: &str = "escort:jobs";
pub const ADMIN_ALERTS: &str = "admin:alerts";
pub const TERMINALS_ALERTS: &str = "terminals:alerts";

/// Private channel of a user.
pub fn user(user_id: &str) -> String {
    format!("user:{user_id}")
}

/// Private notification channel of a user.
pub fn user_notifications(user_id: &str) -> String {
    format!("user-notifications:{user_id}")
}

pub fn company(company_id: &str) -> String {
    format!("company:{company_id}")
}

pub fn company_fleet(company_id: &str) -> String {
    format!("fleet:{company_id}")
}

pub fn company_dispatch(company_id: &str) -> String {
    format!("dispatch:{company_id}")
}

pub fn driver(driver_id: &str) -> String {
    format!("driver:{driver_id}")
}

pub fn load(load_id: &str) -> String {
    format!("load:{load_id}")
}

/// Position updates for a single load.
pub fn load_tracking(load_id: &str) -> String {
    format!("load:tracking:{load_id}")
}

pub fn load_bids(load_id: &str) -> String {
    format!("load:bids:{load_id}")
}

pub fn load_documents(load_id: &str) -> String {
    format!("load:documents:{load_id}")
}

pub fn terminal(terminal_id: &str) -> String {
    format!("terminal:{terminal_id}")
}

pub fn terminal_queue(terminal_id: &str) -> String {
    format!("terminal:queue:{terminal_id}")
}

pub fn vehicle(vehicle_id: &str) -> String {
    format!("vehicle:{vehicle_id}")
}

pub fn conversation(conversation_id: &str) -> String {
    format!("conversation:{conversation_id}")
}

pub fn escort_job(job_id: &str) -> String {
    format!("escort:job:{job_id}")
}
