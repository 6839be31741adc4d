pub mod image_request;
pub mod json_body;
