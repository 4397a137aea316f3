pub mod image_upload;
pub mod validated_json;

pub use image_upload::ImageUpload;
pub use validated_json::ValidatedJson;
