pub mod admins;
pub mod auth;
pub mod leads;
pub mod payments;
