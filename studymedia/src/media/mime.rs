//! MIME type and file extension tables for stored media.

/// Extension used when a MIME type is not in the table.
pub const FALLBACK_EXTENSION: &str = "bin";

/// Extensions probed, in order, when resolving a stored media ID back to a file.
pub const CANDIDATE_EXTENSIONS: [&str; 11] = ["jpg", "jpeg", "png", "gif", "webp", "svg", "mp4", "webm", "ogg", "mov", "bin"];

/// File extension for a stored attachment of the given MIME type.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/ogg" => "ogg",
        "video/quicktime" => "mov",
        _ => FALLBACK_EXTENSION,
    }
}

/// `Content-Type` for a served file, derived from its extension.
pub fn content_type_for(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
