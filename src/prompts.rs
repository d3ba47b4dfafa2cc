//! Prompts for every AI operation.
//!
//! Centralising prompts here means a wording change touches exactly one
//! place, and unit tests can inspect them without a live model.
//!
//! Text operations embed the user's text between `---` delimiters followed
//! by an answer cue ("Summary:", "Translation:", ...). Image operations send
//! the image first and the instruction second.

/// Literal answer of the table extractor for a page with no tables.
pub const NO_TABLES_FOUND: &str = "NO_TABLES_FOUND";

/// Instruction sent with a background-removal request.
pub const REMOVE_BACKGROUND_INSTRUCTION: &str = "Remove the background from this image, making it transparent. Return only the subject with a transparent background.";

/// Instruction sent with each page image for table extraction.
pub const TABLE_EXTRACTION_INSTRUCTION: &str = r#"Analyze this image of a document page. Identify any tables.
Extract all data from any tables found and format it as clean CSV (Comma Separated Values).
- Use a comma (,) as the delimiter.
- Enclose fields in double quotes ("") if they contain commas or newlines.
- If multiple tables exist, separate their CSV data with two blank newlines.
- If no tables are found on this page, return the exact text: NO_TABLES_FOUND
Return ONLY the CSV data or the specified text for no tables. Do not include markdown formatting, explanations, or any other text."#;

/// Sampling for summaries: `(temperature, top_p, top_k)`.
pub const SUMMARY_SAMPLING: (f32, f32, u32) = (0.3, 0.9, 20);

/// Summary prompt for `text`.
pub fn summarize_prompt(text: &str) -> String {
    format!(
        "Please provide a concise summary of the following document. Focus on the key points and main ideas. The summary should be easy to understand for a general audience.\n\n\
Document:\n---\n{text}\n---\n\nSummary:"
    )
}

/// Translation prompt; `language` is a display name such as "Spanish".
pub fn translate_prompt(text: &str, language: &str) -> String {
    format!(
        "Translate the following text to {language}. Return only the translated text, without any additional comments or explanations.\n\n\
Text:\n---\n{text}\n---\n\nTranslation:"
    )
}

/// Spelling and grammar correction prompt.
pub fn correct_prompt(text: &str) -> String {
    format!(
        "Please correct the spelling and grammar of the following text. Return only the corrected text, without any explanations or comments about the changes.\n\n\
Original Text:\n---\n{text}\n---\n\nCorrected Text:"
    )
}

/// Lower-cased phrases that mark a model reply as a refusal.
pub const REFUSAL_MARKERS: &[&str] = &["i can't", "i am unable"];

/// True if `reply` reads as the model declining the task.
pub fn is_refusal(reply: &str) -> bool {
    let lower = reply.to_lowercase().replace('\u{2019}', "'");
    REFUSAL_MARKERS.iter().any(|m| lower.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_embedded_between_delimiters() {
        let p = summarize_prompt("hello world");
        assert!(p.contains("Document:\n---\nhello world\n---\n\nSummary:"));
        assert!(p.starts_with("Please provide a concise summary"));
    }

    #[test]
    fn translation_names_target_language() {
        let p = translate_prompt("hola", "German");
        assert!(p.starts_with("Translate the following text to German."));
        assert!(p.ends_with("Translation:"));
    }

    #[test]
    fn correction_cue() {
        assert!(correct_prompt("teh").contains("Original Text:\n---\nteh\n---"));
    }

    #[test]
    fn table_instruction_mentions_sentinel() {
        assert!(TABLE_EXTRACTION_INSTRUCTION.contains(NO_TABLES_FOUND));
    }

    #[test]
    fn refusal_detection_is_case_insensitive() {
        assert!(is_refusal("I can't help with that."));
        assert!(is_refusal("Sorry, I CAN'T edit this"));
        assert!(is_refusal("I can\u{2019}t do this"));
        assert!(is_refusal("I am unable to process images of people"));
        assert!(!is_refusal("Here is your image."));
    }
}
