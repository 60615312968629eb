//! Order-level views: business health and delivery friction

pub mod friction;
pub mod health;

pub use friction::{friction_diagnosis, DeviationBox, FrictionDiagnosis};
pub use health::{business_health, BusinessHealth, MonthlyRevenue, StateVolume, StatusCount};
