//! Turns a scrubbed configuration into the committed `.example` template.
//!
//! The template is the same document with its header metadata renamed and a
//! short instruction block spliced into the header comment.

/// Appended to the live configuration's file name to form the template name.
pub const EXAMPLE_SUFFIX: &str = ".example";

const INSTRUCTIONS: &str =
    " * INSTRUCTIONS: Copy this file to device_config.h and fill in your actual credentials.\n \
     * The device_config.h file is gitignored to keep your secrets safe.";

/// Render the `.example` form of an already-scrubbed configuration document.
///
/// Expects the text to have passed scrubbing; this function does not inspect
/// values, only the doc-comment header.
pub fn render_template(clean_text: &str) -> String {
    let text = clean_text
        .replace("@file device_config.h", "@file device_config.h.example")
        .replace(
            "@brief Configuration settings for",
            "@brief Configuration settings template for",
        );

    // Splice the instructions in before the end of the header comment,
    // dropping any trailing empty comment line first.
    if let Some((head, tail)) = text.split_once(" */\n") {
        let mut head = head.trim_end();
        if let Some(stripped) = head.strip_suffix(" *") {
            head = stripped.trim_end();
        }
        return format!("{head}\n *\n{INSTRUCTIONS}\n */\n{tail}");
    }

    text
}
