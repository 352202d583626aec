/// Lowercase ascii slug: the input is transliterated to ascii, alphanumeric runs are kept and
/// everything else collapses into a single `-`.
pub fn slugify(input: &str) -> String {
    let input = deunicode::deunicode(input);
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

pub fn consume_while<'s>(input: &mut &'s str, predicate: impl FnMut(&char) -> bool) -> &'s str {
    let len: usize = input
        .chars()
        .take_while(predicate)
        .map(char::len_utf8)
        .sum();
    let result = &input[..len];
    *input = &input[len..];
    result
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        format_args!(
            "{}{}",
            &$query[..$crate::floor_char_boundary(&$query, 497)].trim_end(),
            if $query.len() > 497 { "..." } else { "" },
        )
    };
}

#[doc(hidden)]
pub fn floor_char_boundary(value: &str, index: usize) -> usize {
    if index >= value.len() {
        return value.len();
    }
    (0..=index)
        .rev()
        .find(|i| value.is_char_boundary(*i))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug() {
        assert_eq!(slugify("Reporting Job"), "reporting-job");
        assert_eq!(slugify("  --Batch #42--  "), "batch-42");
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("été"), "ete");
        assert_eq!(slugify("Été export"), "ete-export");
        assert_ne!(slugify("café"), slugify("caf"));
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn consume() {
        let mut input = "1h30m";
        assert_eq!(consume_while(&mut input, char::is_ascii_digit), "1");
        assert_eq!(input, "h30m");
        assert_eq!(consume_while(&mut input, char::is_ascii_digit), "");
        assert_eq!(input, "h30m");
    }

    #[test]
    fn truncate() {
        let long = "x".repeat(600);
        let printed = format!("{}", truncate_long!(long));
        assert_eq!(printed.len(), 500);
        assert!(printed.ends_with("..."));
        assert_eq!(format!("{}", truncate_long!("SELECT 1")), "SELECT 1");
    }
}
