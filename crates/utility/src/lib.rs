pub mod geo;
pub mod id;
pub mod postcode;
pub mod serde;
