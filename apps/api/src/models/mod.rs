pub mod email;
pub mod integration;
pub mod job_application;
pub mod processed_email;
