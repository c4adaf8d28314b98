pub mod axis_service;
pub mod chart_service;
pub mod payload_service;
