use crate::models::{Service, Specialist};

pub const NO_SPECIALISTS_MESSAGE: &str = "No specialists available for this service";

/// A specialist with no declared services is a generalist and offers everything.
pub fn offers(specialist: &Specialist, service_id: &str) -> bool {
    specialist.services.is_empty() || specialist.services.iter().any(|id| id == service_id)
}

/// Specialists that can perform `service`. Without a service only generalists qualify.
pub fn visible_specialists<'a>(
    specialists: &'a [Specialist],
    service: Option<&Service>,
) -> Vec<&'a Specialist> {
    specialists
        .iter()
        .filter(|s| match service {
            Some(service) => offers(s, &service.id),
            None => s.services.is_empty(),
        })
        .collect()
}
