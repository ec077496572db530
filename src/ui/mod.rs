pub mod analyzer;
pub mod form;
pub mod gauge;
pub mod notice;
pub mod request;
pub mod results;
