pub mod auth;
pub mod events;
pub mod leads;
pub mod notifications;
pub mod payments;
pub mod roles;
pub mod visibility;
