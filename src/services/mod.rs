pub mod automation_service;
pub mod baserow_service;
pub mod google_service;
pub mod recruiting_service;
pub mod scheduling_service;
pub mod user_service;
