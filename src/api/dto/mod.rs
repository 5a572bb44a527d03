//! Data Transfer Objects for REST request/response serialization.

pub mod annotation_dto;
pub mod notification_dto;

pub use annotation_dto::*;
pub use notification_dto::*;
