pub mod dashboard_app;
pub mod panels;
pub mod theme;
