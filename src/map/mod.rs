pub mod hex_layer;
pub mod map;
pub mod projection;
