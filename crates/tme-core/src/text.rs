//! Text normalization helpers shared by the scorer and resolvers

/// Title-case text: upper-case the first letter of every alphabetic run and
/// lower-case the rest.
///
/// Any non-alphabetic character starts a new run, so `o'brien-smith`
/// becomes `O'Brien-Smith`.
pub fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut previous_is_alpha = false;

    for c in text.chars() {
        if c.is_alphabetic() {
            if previous_is_alpha {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            previous_is_alpha = true;
        } else {
            result.push(c);
            previous_is_alpha = false;
        }
    }

    result
}

/// Count how many of `needles` occur as substrings of `haystack`.
///
/// Needles are expected to already be lower-cased, as the lexicon stores them.
pub fn count_matches<'a, I>(haystack: &str, needles: I) -> usize
where
    I: IntoIterator<Item = &'a String>,
{
    needles
        .into_iter()
        .filter(|needle| !needle.is_empty() && haystack.contains(needle.as_str()))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("jane marie DOE"), "Jane Marie Doe");
        assert_eq!(title_case("o'brien-smith"), "O'Brien-Smith");
        assert_eq!(title_case("  lincoln high school "), "  Lincoln High School ");
        assert_eq!(title_case("8/7/2012"), "8/7/2012");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_count_matches() {
        let needles = vec!["name".to_string(), "student".to_string(), String::new()];
        assert_eq!(count_matches("student name", &needles), 2);
        assert_eq!(count_matches("date of birth", &needles), 0);
    }

    proptest::proptest! {
        #[test]
        fn prop_title_case_is_idempotent(text in "[a-zA-Z ',./-]{0,30}") {
            let once = title_case(&text);
            proptest::prop_assert_eq!(title_case(&once), once);
        }
    }
}
