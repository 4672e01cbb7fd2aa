pub mod export;
pub mod request;
pub mod response;
