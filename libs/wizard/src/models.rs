use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ── Catalog ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub business_name: String,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub specialists: Vec<Specialist>,
    #[serde(default)]
    pub settings: BusinessSettings,
    #[serde(default)]
    pub working_hours: Option<Vec<WorkingDay>>,
}

impl Business {
    pub fn service(&self, id: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.id == id)
    }

    pub fn specialist(&self, id: &str) -> Option<&Specialist> {
        self.specialists.iter().find(|s| s.id == id)
    }

    /// "street, city" with missing parts dropped.
    pub fn address_line(&self) -> Option<String> {
        let address = self.address.as_ref()?;
        let parts: Vec<&str> = [address.street.as_deref(), address.city.as_deref()]
            .into_iter()
            .flatten()
            .filter(|p| !p.trim().is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessSettings {
    #[serde(default)]
    pub allow_specific_times: bool,
}

/// Opening schedule for one weekday. `day_of_week` counts from Sunday = 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingDay {
    pub day_of_week: u8,
    #[serde(default)]
    pub is_open: bool,
    #[serde(default)]
    pub shifts: Vec<Shift>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Minutes.
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub price: Option<Price>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub amount: f64,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specialist {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Ids of the services this specialist provides. Empty means "offers everything".
    #[serde(default, deserialize_with = "service_refs::deserialize")]
    pub services: Vec<String>,
}

/// The backend sends `specialist.services` either as plain ids or as embedded
/// service documents; both collapse to ids here.
mod service_refs {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ServiceRef {
        Id(String),
        Embedded {
            #[serde(rename = "_id", alias = "id")]
            id: String,
        },
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let refs = Option::<Vec<ServiceRef>>::deserialize(deserializer)?.unwrap_or_default();
        Ok(refs
            .into_iter()
            .map(|r| match r {
                ServiceRef::Id(id) | ServiceRef::Embedded { id } => id,
            })
            .collect())
    }
}

// ── Scheduling ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    /// "HH:MM".
    pub start_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    pub is_available: bool,
    #[serde(default)]
    pub is_custom_time: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

/// Result of a successful custom-time check; the backend's times are authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTime {
    pub start_time: String,
    pub end_time: Option<String>,
    pub duration: Option<u32>,
}

impl From<ValidatedTime> for TimeSlot {
    fn from(v: ValidatedTime) -> Self {
        Self {
            start_time: v.start_time,
            end_time: v.end_time,
            is_available: true,
            is_custom_time: true,
            duration: v.duration,
        }
    }
}

// ── Customer ──

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

// ── Backend request/response types ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub specialist_id: String,
    pub service_id: String,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityResponse {
    #[serde(default)]
    pub slots: Option<Vec<TimeSlot>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomTimeRequest {
    pub specialist_id: String,
    pub service_id: String,
    pub booking_date: NaiveDate,
    pub custom_start_time: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomTimeResponse {
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingCustomer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub business_id: String,
    pub service_id: String,
    pub specialist_id: String,
    pub booking_date: NaiveDate,
    pub start_time: String,
    pub customer_info: BookingCustomer,
    pub notes: String,
    pub is_guest_booking: bool,
}

/// Booking record as created by the backend. Fields the wizard does not read are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Backend envelope: `{ "success": true, "data": { ... } }`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct BookingPayload {
    pub booking: Booking,
}

#[derive(Debug, Deserialize)]
pub struct BusinessPayload {
    pub business: Business,
}

#[derive(Debug, Deserialize)]
pub struct UserPayload {
    pub user: UserProfile,
}

// ── Outcome ──

/// Everything the host needs once the booking exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub booking: Booking,
    pub service: Service,
    pub specialist: Specialist,
    pub date: NaiveDate,
    pub time: TimeSlot,
    pub customer_info: CustomerInfo,
}
