pub mod admin_repo;
pub use admin_repo::AdminRepository;
pub mod lead_repo;
pub use lead_repo::{LeadFilter, LeadRepository};
pub mod event_repo;
pub use event_repo::LeadEventRepository;
