//! Advisory identifiers derived from calendar names.

/// Used when a name has no alphanumeric characters at all.
pub const FALLBACK_ID: &str = "calendar";

/// Lower-case `name`, collapse every run of non-alphanumeric characters into a
/// single `separator`, trim separators from both ends and truncate to `max_len`
/// characters.
///
/// ```
/// use fabula_engine::suggested_id;
///
/// assert_eq!(suggested_id("The Harptos Calendar!", 48, '-'), "the-harptos-calendar");
/// ```
pub fn suggested_id(name: &str, max_len: usize, separator: char) -> String {
    let mut id = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_separator && !id.is_empty() {
                id.push(separator);
            }
            pending_separator = false;
            id.push(c);
        } else {
            pending_separator = true;
        }
    }

    let mut id: String = id.chars().take(max_len.max(1)).collect();
    while id.ends_with(separator) {
        id.pop();
    }
    if id.is_empty() {
        return FALLBACK_ID.to_string();
    }
    id
}
