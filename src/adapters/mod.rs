pub mod csv_adapter;
pub mod csv_report_adapter;
pub mod file_config_adapter;
pub mod signal_log_adapter;
