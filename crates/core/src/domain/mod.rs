pub mod account;
pub mod hosted_service;
pub mod listing;
pub mod payment;
pub mod publisher;
pub mod submission;
