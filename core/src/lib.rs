pub mod aggregate;
pub mod derived;
pub mod goal;
pub mod models;
pub mod series;
pub mod source;
