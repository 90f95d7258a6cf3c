pub mod content_stream;
pub mod pixel;
