// Full provisioning run
pub mod provision;

// Helper tasks
pub mod command;
pub mod hostvars;
pub mod list;
