//! Request and response models.

pub mod dashboard;
pub mod health;
