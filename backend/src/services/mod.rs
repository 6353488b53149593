pub mod audit_log;
pub mod authorization;
pub mod backup;
pub mod change_reactor;
pub mod role_assignment;
pub mod scheduler;
