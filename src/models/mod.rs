pub mod baserow;
pub mod candidate;
pub mod job;
pub mod schedule;
pub mod user;
