/// Replaces every character that is invalid in a file name with `-`.
///
/// Uses the Windows set (`\ / : * ? " < > |` and control characters) so a
/// staged name is portable. No trimming or truncation: `My/Article:Name`
/// becomes `My-Article-Name`.
pub fn sanitize_file_name(title: &str) -> String {
    title
        .chars()
        .map(|c| if is_forbidden(c) { '-' } else { c })
        .collect()
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}
