//! Report generation port trait.

use crate::domain::dashboard::Dashboard;
use crate::domain::error::TickerdeskError;

/// Port for writing a rendered dashboard.
pub trait ReportPort {
    fn write(&self, dashboard: &Dashboard, output_path: &str) -> Result<(), TickerdeskError>;
}
