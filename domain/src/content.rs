//! Validation of user-written text and extraction of `@username` mentions.
use crate::error::Error;

pub const MAX_CONTENT_CHARS: usize = 480;
pub const MAX_USERNAME_CHARS: usize = 18;

/// Trims `content` and checks it is non-empty and at most
/// [`MAX_CONTENT_CHARS`] characters long.
pub fn validate(content: &str) -> Result<String, Error> {
    let content = content.trim();

    if content.is_empty() {
        return Err(Error::invalid("content must not be empty"));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(Error::invalid(format!(
            "content must be at most {MAX_CONTENT_CHARS} characters"
        )));
    }

    Ok(content.to_string())
}

fn is_username_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// A username starts with a letter and continues with letters, digits, `_`
/// or `-`.
pub fn is_valid_username(username: &str) -> bool {
    let mut chars = username.chars();

    matches!(chars.next(), Some(first) if first.is_ascii_alphabetic())
        && chars.all(is_username_char)
        && username.len() <= MAX_USERNAME_CHARS
}

/// Usernames mentioned in `content`, in order of first appearance and without
/// duplicates. An `@` preceded by a username character (as in an email
/// address) does not start a mention.
pub fn mentions(content: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    let mut previous: Option<char> = None;
    let mut chars = content.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        let starts_mention = c == '@' && !previous.is_some_and(is_username_char);
        previous = Some(c);
        if !starts_mention {
            continue;
        }

        let start = index + c.len_utf8();
        let mut end = start;
        while let Some(&(next_index, next)) = chars.peek() {
            if !is_username_char(next) {
                break;
            }
            end = next_index + next.len_utf8();
            previous = Some(next);
            chars.next();
        }

        let username = &content[start..end];
        if is_valid_username(username) && !found.iter().any(|u| u == username) {
            found.push(username.to_string());
        }
    }

    found
}
