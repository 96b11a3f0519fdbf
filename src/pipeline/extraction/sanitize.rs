/// Characters kept besides alphanumerics and whitespace: the punctuation that
/// shows up in lab values, units, dosages and dates.
fn is_report_punctuation(c: char) -> bool {
    matches!(
        c,
        '.' | ','
            | ';'
            | ':'
            | '-'
            | '/'
            | '('
            | ')'
            | '['
            | ']'
            | '+'
            | '='
            | '%'
            | '#'
            | '&'
            | '\''
            | '"'
            | '<'
            | '>'
            | '*'
            | '_'
            | '^'
            | '°'
            | '²'
            | '³'
            | 'µ'
            | '\u{2013}' // En-dash
            | '\u{2019}' // Right single quotation mark
    )
}

/// Clean decoded document text before classification and entity scanning.
/// Drops control characters, trims every line and removes blank lines.
pub fn sanitize_extracted_text(raw: &str) -> String {
    raw.chars()
        .map(|c| if c == '\t' { ' ' } else { c })
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || is_report_punctuation(*c))
        .collect::<String>()
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
