pub mod http_client;
pub mod mime_utils;
