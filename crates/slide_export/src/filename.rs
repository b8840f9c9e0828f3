pub const DEFAULT_BASENAME: &str = "presentation";

fn is_reserved(c: char) -> bool {
    matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') || u32::from(c) < 0x20
}

/// Turns a deck title into a file base name that is valid on every common
/// filesystem. Titles with nothing but reserved characters or whitespace get
/// [`DEFAULT_BASENAME`].
pub fn sanitize_filename(title: &str) -> String {
    let has_content = title.chars().any(|c| !is_reserved(c) && !c.is_whitespace());
    if !has_content {
        return DEFAULT_BASENAME.to_string();
    }
    let replaced: String = title
        .chars()
        .map(|c| if is_reserved(c) { '_' } else { c })
        .collect();
    replaced.trim().to_string()
}

pub fn pdf_filename(title: &str) -> String {
    format!("{}.pdf", sanitize_filename(title))
}
