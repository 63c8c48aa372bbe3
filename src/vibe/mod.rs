pub mod color_scale;
pub mod dataset;
pub mod model;
pub mod popup;
pub mod pulse;
