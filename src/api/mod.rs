pub mod scenario_dto;
pub mod schedule_report_dto;
pub mod scheduler_config_dto;
