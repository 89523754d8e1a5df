/// Non-empty lower-cased text, or `None` when absent or empty.
fn lowered(text: Option<&str>) -> Option<String> {
    text.filter(|t| !t.is_empty()).map(str::to_lowercase)
}

/// Post must contain the rule message, ignoring case.
pub fn post_contains(message: Option<&str>, post: Option<&str>) -> bool {
    match (lowered(post), message) {
        (Some(post), Some(message)) => post.contains(&message.to_lowercase()),
        _ => false,
    }
}

/// Reply rule.
///
/// The message is `"<target> <content>"`. The post must mention both the
/// target and the content. When the target is a numeric id (replies addressed
/// by post id rather than handle) the content alone is enough.
pub fn reply_matches(message: Option<&str>, post: Option<&str>) -> bool {
    let (Some(post), Some(message)) = (lowered(post), message) else {
        return false;
    };

    let message = message.to_lowercase();
    let (target, content) = match message.split_once(' ') {
        Some((target, rest)) => (target, rest.trim()),
        None => (message.as_str(), ""),
    };

    if post.contains(target) && post.contains(content) {
        return true;
    }

    is_numeric_literal(target) && post.contains(content)
}

/// Choice rule.
///
/// Walks `choices` in order and remembers the last one found in the rule
/// message and, separately, the last one found in the post. The rule passes
/// when both are the same choice, including when neither matched.
pub fn choice_matches(message: Option<&str>, post: Option<&str>, choices: &[String]) -> bool {
    let message = lowered(message);
    let post = lowered(post);

    let mut validator_match: Option<&str> = None;
    let mut user_match: Option<&str> = None;

    for choice in choices {
        let needle = choice.to_lowercase();

        if message.as_deref().is_some_and(|m| m.contains(&needle)) {
            validator_match = Some(choice);
        }
        if post.as_deref().is_some_and(|p| p.contains(&needle)) {
            user_match = Some(choice);
        }
    }

    user_match == validator_match
}

/// Whether `s` reads as a number under loose JSON-client conversion rules:
/// empty text is zero, `0x`/`0o`/`0b` prefixes are allowed, and overflow to
/// infinity still counts.
pub fn is_numeric_literal(s: &str) -> bool {
    let t = s.trim();
    if t.is_empty() {
        return true;
    }

    let lower = t.to_ascii_lowercase();
    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        if let Some(digits) = lower.strip_prefix(prefix) {
            return !digits.is_empty() && digits.chars().all(|c| c.is_digit(radix));
        }
    }

    // Rust accepts "inf" and "nan" spellings that clients would not.
    if lower.chars().any(|c| c.is_ascii_alphabetic() && c != 'e') {
        return false;
    }

    lower.parse::<f64>().is_ok_and(|v| !v.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_post_case_insensitive() {
        assert!(post_contains(Some("hello"), Some("Hello World")));
        assert!(post_contains(Some("WORLD"), Some("Hello World")));
        assert!(!post_contains(Some("hello"), Some("goodbye")));
    }

    #[test]
    fn test_post_missing_or_empty() {
        assert!(!post_contains(Some("hello"), None));
        assert!(!post_contains(Some(""), Some("")));
        assert!(!post_contains(None, Some("hello")));
    }

    #[test]
    fn test_reply_handle_and_content() {
        assert!(reply_matches(Some("@user hello"), Some("@user hello world!")));
        assert!(!reply_matches(Some("@user hello"), Some("hello world!")));
        assert!(!reply_matches(Some("@user hello"), Some("@user goodbye")));
    }

    #[test]
    fn test_reply_numeric_target_needs_content_only() {
        assert!(reply_matches(
            Some("1790000000000000000 great thread"),
            Some("Great thread, agreed")
        ));
        assert!(!reply_matches(
            Some("1790000000000000000 great thread"),
            Some("nope")
        ));
    }

    #[test]
    fn test_reply_without_content() {
        // a bare target has empty content
        assert!(reply_matches(Some("@user"), Some("hi @user")));
        // numeric bare target matches any non-empty post
        assert!(reply_matches(Some("42"), Some("anything")));
    }

    #[test]
    fn test_reply_leading_space_treats_target_as_empty() {
        assert!(reply_matches(Some(" hello"), Some("say hello")));
    }

    #[test]
    fn test_choice_single_match() {
        let choices = strings(&["A", "B"]);
        assert!(choice_matches(Some("pick A"), Some("I pick A"), &choices));
        assert!(!choice_matches(Some("pick A"), Some("I pick B"), &choices));
    }

    #[test]
    fn test_choice_last_match_wins() {
        // Both letters appear in both texts; the last choice in iteration
        // order decides on each side.
        let message = Some("a or b");
        let post = Some("b, not a");

        assert!(choice_matches(message, post, &strings(&["A", "B"])));
        assert!(choice_matches(message, post, &strings(&["B", "A"])));

        // Only the message mentions both; the post mentions the first choice.
        let post_first_only = Some("a");
        assert!(!choice_matches(message, post_first_only, &strings(&["A", "B"])));
        assert!(choice_matches(message, post_first_only, &strings(&["B", "A"])));
    }

    #[test]
    fn test_choice_no_matches_is_equal() {
        let choices = strings(&["x", "y"]);
        assert!(choice_matches(Some("none"), Some("nothing"), &choices));
        assert!(choice_matches(Some("pick"), None, &[]));
    }

    #[test]
    fn test_numeric_literals() {
        for yes in ["", "0", "42", "-3.5", "1e5", "0x1a", "0b101", ".5", "1e400"] {
            assert!(is_numeric_literal(yes), "{yes:?} should be numeric");
        }
        for no in ["@user", "nan", "inf", "infinity", "0x", "12abc", "0xzz", "e"] {
            assert!(!is_numeric_literal(no), "{no:?} should not be numeric");
        }
    }
}
