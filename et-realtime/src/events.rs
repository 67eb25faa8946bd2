//! Realtime event catalog and typed payloads.
//!
//! Every frame carries a `type` drawn from the catalog below. The enum is
//! generated from a single `(Variant => "wire_name")` table so the wire names,
//! the parser and the `all()` listing cannot drift apart. Names the catalog
//! does not know are preserved as [`EventType::Unknown`].

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! event_catalog {
    ($( $(#[$meta:meta])* $variant:ident => $name:literal ),+ $(,)?) => {
        /// All event types exchanged over the realtime connection.
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum EventType {
            $( $(#[$meta])* $variant, )+
            /// Event name not present in the catalog.
            Unknown(String),
        }

        impl EventType {
            /// Wire names of every catalogued event type, in declaration order.
            pub const ALL_NAMES: &'static [&'static str] = &[ $( $name ),+ ];

            /// Parse an event name received from the server.
            pub fn from_name(s: &str) -> Self {
                match s {
                    $( $name => Self::$variant, )+
                    other => Self::Unknown(other.to_string()),
                }
            }

            /// The wire name of this event type.
            pub fn as_str(&self) -> &str {
                match self {
                    $( Self::$variant => $name, )+
                    Self::Unknown(s) => s.as_str(),
                }
            }
        }
    };
}

event_catalog! {
    // -- Protocol control --
    /// Client authentication frame.
    Auth => "auth",
    /// Server accepted the authentication frame.
    AuthSuccess => "auth_success",
    /// Server rejected the authentication frame.
    AuthError => "auth_error",
    /// Client request to start receiving a channel.
    Subscribe => "subscribe",
    /// Client request to stop receiving a channel.
    Unsubscribe => "unsubscribe",
    /// Server confirmed a channel subscription.
    Subscribed => "subscribed",
    /// Server confirmed a channel unsubscription.
    Unsubscribed => "unsubscribed",
    /// Client keep-alive.
    Ping => "ping",
    /// Server keep-alive reply.
    Pong => "pong",
    /// Server-side protocol error.
    ServerError => "error",
    SystemAnnouncement => "system_announcement",
    SystemMaintenance => "system_maintenance",

    // -- Loads --
    LoadCreated => "load_created",
    LoadUpdated => "load_updated",
    LoadPosted => "load_posted",
    LoadAssigned => "load_assigned",
    LoadStatusChanged => "load_status_changed",
    LoadCancelled => "load_cancelled",
    LoadPickedUp => "load_picked_up",
    LoadInTransit => "load_in_transit",
    LoadDelivered => "load_delivered",
    LoadDelayed => "load_delayed",
    LoadEtaUpdated => "load_eta_updated",
    LoadLocationUpdated => "load_location_updated",
    LoadDocumentUploaded => "load_document_uploaded",
    LoadRateConfirmed => "load_rate_confirmed",
    LoadTendered => "load_tendered",
    LoadDeleted => "load_deleted",

    // -- Tracking --
    /// Position report tied to a load or driver.
    LocationUpdate => "location_update",
    DriverLocationUpdated => "driver_location_updated",
    VehicleLocationUpdated => "vehicle_location_updated",
    GeofenceEntered => "geofence_entered",
    GeofenceExited => "geofence_exited",
    RouteDeviation => "route_deviation",
    TrackingStarted => "tracking_started",
    TrackingStopped => "tracking_stopped",

    // -- Bids and marketplace --
    BidSubmitted => "bid_submitted",
    BidReceived => "bid_received",
    BidAccepted => "bid_accepted",
    BidRejected => "bid_rejected",
    BidCountered => "bid_countered",
    BidWithdrawn => "bid_withdrawn",
    BidExpired => "bid_expired",
    MarketplaceLoadAdded => "marketplace_load_added",
    MarketplaceLoadRemoved => "marketplace_load_removed",
    MarketplaceRateUpdated => "marketplace_rate_updated",

    // -- Drivers --
    DriverStatusChanged => "driver_status_changed",
    DriverAssigned => "driver_assigned",
    DriverUnassigned => "driver_unassigned",
    DriverHosUpdated => "driver_hos_updated",
    DriverHosViolation => "driver_hos_violation",
    DriverDutyStatusChanged => "driver_duty_status_changed",
    DriverCheckedIn => "driver_checked_in",
    DriverCheckedOut => "driver_checked_out",
    DriverInspectionSubmitted => "driver_inspection_submitted",
    DriverPerformanceUpdated => "driver_performance_updated",

    // -- Fleet --
    VehicleStatusChanged => "vehicle_status_changed",
    VehicleMaintenanceDue => "vehicle_maintenance_due",
    VehicleFaultCode => "vehicle_fault_code",
    VehicleAssigned => "vehicle_assigned",
    TrailerAssigned => "trailer_assigned",
    FleetUpdated => "fleet_updated",
    FuelLevelLow => "fuel_level_low",
    EldDisconnected => "eld_disconnected",

    // -- Dispatch --
    DispatchCreated => "dispatch_created",
    DispatchUpdated => "dispatch_updated",
    DispatchAssigned => "dispatch_assigned",
    DispatchCancelled => "dispatch_cancelled",
    DispatchBoardUpdated => "dispatch_board_updated",
    DispatchException => "dispatch_exception",

    // -- Terminals --
    TerminalAppointmentScheduled => "terminal_appointment_scheduled",
    TerminalAppointmentUpdated => "terminal_appointment_updated",
    TerminalAppointmentCancelled => "terminal_appointment_cancelled",
    TerminalGateIn => "terminal_gate_in",
    TerminalGateOut => "terminal_gate_out",
    TerminalQueueUpdated => "terminal_queue_updated",
    TerminalDockAssigned => "terminal_dock_assigned",
    TerminalLoadingStarted => "terminal_loading_started",
    TerminalLoadingCompleted => "terminal_loading_completed",
    TerminalCapacityUpdated => "terminal_capacity_updated",

    // -- Compliance --
    ComplianceAlert => "compliance_alert",
    ComplianceStatusChanged => "compliance_status_changed",
    ComplianceDocumentExpiring => "compliance_document_expiring",
    ComplianceDocumentExpired => "compliance_document_expired",
    ComplianceAuditScheduled => "compliance_audit_scheduled",
    InsuranceExpiring => "insurance_expiring",
    PermitExpiring => "permit_expiring",
    HazmatCertificationExpiring => "hazmat_certification_expiring",

    // -- Safety --
    SafetyAlert => "safety_alert",
    SafetyIncidentReported => "safety_incident_reported",
    SafetyIncidentUpdated => "safety_incident_updated",
    SafetyScoreUpdated => "safety_score_updated",
    EmergencyAlert => "emergency_alert",
    WeatherAlert => "weather_alert",
    HazmatIncident => "hazmat_incident",

    // -- Messaging and notifications --
    Notification => "notification",
    NotificationRead => "notification_read",
    MessageReceived => "message_received",
    MessageRead => "message_read",
    TypingStarted => "typing_started",
    TypingStopped => "typing_stopped",
    ConversationCreated => "conversation_created",
    ConversationUpdated => "conversation_updated",

    // -- Escort operations --
    EscortJobPosted => "escort_job_posted",
    EscortJobAssigned => "escort_job_assigned",
    EscortJobUpdated => "escort_job_updated",
    EscortJobCompleted => "escort_job_completed",
    EscortJobCancelled => "escort_job_cancelled",
    EscortLocationUpdated => "escort_location_updated",

    // -- Billing and documents --
    InvoiceCreated => "invoice_created",
    InvoicePaid => "invoice_paid",
    PaymentReceived => "payment_received",
    PaymentFailed => "payment_failed",
    SettlementProcessed => "settlement_processed",
    DocumentUploaded => "document_uploaded",
    DocumentVerified => "document_verified",
    DocumentRejected => "document_rejected",

    // -- Accounts and administration --
    UserCreated => "user_created",
    UserUpdated => "user_updated",
    UserRoleChanged => "user_role_changed",
    CompanyUpdated => "company_updated",
    CompanyVerificationChanged => "company_verification_changed",
    AdminAlert => "admin_alert",

    // -- Dashboards --
    StatsUpdate => "stats_update",
    KpiUpdated => "kpi_updated",
    LeaderboardUpdated => "leaderboard_updated",
    AchievementUnlocked => "achievement_unlocked",
}

/// Coarse grouping used for filtering and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    Control,
    System,
    Load,
    Tracking,
    Marketplace,
    Driver,
    Fleet,
    Dispatch,
    Terminal,
    Compliance,
    Safety,
    Messaging,
    Escort,
    Billing,
    Account,
    Dashboard,
    Unknown,
}

impl EventType {
    /// Iterate over every catalogued event type.
    pub fn all() -> impl Iterator<Item = EventType> {
        Self::ALL_NAMES.iter().map(|name| Self::from_name(name))
    }

    /// Whether the name was not found in the catalog.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }

    /// Frames that drive the connection itself rather than carry domain data.
    pub fn is_control(&self) -> bool {
        matches!(
            self,
            Self::Auth
                | Self::AuthSuccess
                | Self::AuthError
                | Self::Subscribe
                | Self::Unsubscribe
                | Self::Subscribed
                | Self::Unsubscribed
                | Self::Ping
                | Self::Pong
                | Self::ServerError
        )
    }

    /// Whether this event should be surfaced to the user as an alert.
    pub fn is_alert(&self) -> bool {
        matches!(
            self,
            Self::ComplianceAlert
                | Self::SafetyAlert
                | Self::EmergencyAlert
                | Self::WeatherAlert
                | Self::HazmatIncident
                | Self::AdminAlert
                | Self::DriverHosViolation
                | Self::RouteDeviation
        )
    }

    /// Coarse category of this event.
    pub fn category(&self) -> EventCategory {
        if self.is_control() {
            return EventCategory::Control;
        }
        let name = self.as_str();
        let prefixed = |prefixes: &[&str]| prefixes.iter().any(|p| name.starts_with(p));

        if self.is_unknown() {
            EventCategory::Unknown
        } else if prefixed(&["system_"]) {
            EventCategory::System
        } else if prefixed(&["load_"]) {
            EventCategory::Load
        } else if prefixed(&[
            "location_",
            "driver_location",
            "vehicle_location",
            "geofence_",
            "route_",
            "tracking_",
        ]) {
            EventCategory::Tracking
        } else if prefixed(&["bid_", "marketplace_"]) {
            EventCategory::Marketplace
        } else if prefixed(&["driver_"]) {
            EventCategory::Driver
        } else if prefixed(&["vehicle_", "trailer_", "fleet_", "fuel_", "eld_"]) {
            EventCategory::Fleet
        } else if prefixed(&["dispatch_"]) {
            EventCategory::Dispatch
        } else if prefixed(&["terminal_"]) {
            EventCategory::Terminal
        } else if prefixed(&["compliance_", "insurance_", "permit_", "hazmat_certification"]) {
            EventCategory::Compliance
        } else if prefixed(&["safety_", "emergency_", "weather_", "hazmat_"]) {
            EventCategory::Safety
        } else if prefixed(&["notification", "message_", "typing_", "conversation_"]) {
            EventCategory::Messaging
        } else if prefixed(&["escort_"]) {
            EventCategory::Escort
        } else if prefixed(&["invoice_", "payment_", "settlement_", "document_"]) {
            EventCategory::Billing
        } else if prefixed(&["user_", "company_", "admin_"]) {
            EventCategory::Account
        } else {
            EventCategory::Dashboard
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        Self::from_name(s)
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}

/// Binds an event type to the shape of its `data` payload.
///
/// Implemented by payload structs so handlers can be registered against the
/// decoded type instead of raw JSON.
pub trait TypedEvent: DeserializeOwned + Send + 'static {
    /// The event type whose payload this struct describes.
    fn event_type() -> EventType;
}

macro_rules! typed_event {
    ($payload:ty => $variant:ident) => {
        impl TypedEvent for $payload {
            fn event_type() -> EventType {
                EventType::$variant
            }
        }
    };
}

/// Payload of `auth_success`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSuccess {
    #[serde(default, alias = "userId")]
    pub user_id: Option<String>,
    #[serde(default, alias = "sessionId")]
    pub session_id: Option<String>,
}

/// Payload of `auth_error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthError {
    #[serde(default = "default_auth_error")]
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

fn default_auth_error() -> String {
    "authentication rejected".to_string()
}

/// Payload of `location_update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    #[serde(default)]
    pub load_id: Option<String>,
    #[serde(default)]
    pub driver_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub progress_percentage: Option<f64>,
    /// ISO8601 estimated arrival.
    #[serde(default)]
    pub eta: Option<String>,
}

/// Payload of `load_status_changed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadStatusChanged {
    pub load_id: String,
    #[serde(default)]
    pub load_number: Option<String>,
    #[serde(default)]
    pub old_status: Option<String>,
    pub new_status: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Payload of `bid_received`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidReceived {
    pub load_id: String,
    #[serde(default)]
    pub load_number: Option<String>,
    #[serde(default)]
    pub bid_id: Option<String>,
    pub bid_amount: f64,
    #[serde(default)]
    pub carrier_name: Option<String>,
}

/// Payload of `compliance_alert`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceAlert {
    pub severity: String,
    pub alert_type: String,
    pub message: String,
    #[serde(default)]
    pub requires_action: bool,
}

/// Payload of `notification`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub action_url: Option<String>,
}

/// Payload of `message_received`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageReceived {
    pub conversation_id: String,
    pub message_id: String,
    pub sender_id: String,
    pub content: String,
}

/// Payload of `system_announcement`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemAnnouncement {
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub severity: Option<String>,
}

/// Payload of `driver_hos_updated`. Remaining clocks are in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverHosUpdated {
    pub driver_id: String,
    pub duty_status: String,
    #[serde(default)]
    pub drive_remaining: Option<u32>,
    #[serde(default)]
    pub shift_remaining: Option<u32>,
    #[serde(default)]
    pub cycle_remaining: Option<u32>,
}

/// Payload of `terminal_queue_updated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalQueueUpdated {
    pub terminal_id: String,
    pub queue_length: u32,
    #[serde(default)]
    pub average_wait_minutes: Option<u32>,
}

/// Payload of `stats_update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsUpdate {
    pub stats: serde_json::Value,
}

typed_event!(AuthSuccess => AuthSuccess);
typed_event!(AuthError => AuthError);
typed_event!(LocationUpdate => LocationUpdate);
typed_event!(LoadStatusChanged => LoadStatusChanged);
typed_event!(BidReceived => BidReceived);
typed_event!(ComplianceAlert => ComplianceAlert);
typed_event!(Notification => Notification);
typed_event!(MessageReceived => MessageReceived);
typed_event!(SystemAnnouncement => SystemAnnouncement);
typed_event!(DriverHosUpdated => DriverHosUpdated);
typed_event!(TerminalQueueUpdated => TerminalQueueUpdated);
typed_event!(StatsUpdate => StatsUpdate);
