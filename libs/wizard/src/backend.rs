//! The remote collaborators the wizard talks to.

use async_trait::async_trait;

use crate::error::BackendError;
use crate::models::{
    AvailabilityQuery, Booking, Business, CreateBookingRequest, CustomTimeRequest, TimeSlot,
    UserProfile, ValidatedTime,
};

#[async_trait]
pub trait AvailabilityProvider: Send + Sync {
    async fn available_slots(&self, query: &AvailabilityQuery)
        -> Result<Vec<TimeSlot>, BackendError>;
}

#[async_trait]
pub trait TimeValidator: Send + Sync {
    /// `Err(BackendError::Rejected)` when the time is well-formed but not bookable.
    async fn validate_custom_time(
        &self,
        request: &CustomTimeRequest,
    ) -> Result<ValidatedTime, BackendError>;
}

#[async_trait]
pub trait BookingSubmitter: Send + Sync {
    async fn create_booking(&self, request: &CreateBookingRequest) -> Result<Booking, BackendError>;
}

/// Everything a running wizard needs from the backend.
pub trait BookingBackend: AvailabilityProvider + TimeValidator + BookingSubmitter {}

impl<T> BookingBackend for T where T: AvailabilityProvider + TimeValidator + BookingSubmitter {}

/// Lookups a host performs before opening a session.
#[async_trait]
pub trait BusinessDirectory: Send + Sync {
    async fn business_by_link(&self, booking_link: &str) -> Result<Business, BackendError>;

    /// The signed-in user, or `None` for guests.
    async fn current_user(&self) -> Result<Option<UserProfile>, BackendError>;
}
