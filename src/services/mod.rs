pub mod quota;
pub mod session_service;
pub mod signature_service;
pub mod attendance_service;
