//! Phone number matching by digit suffix.
//!
//! Roster sheets store numbers in whatever shape people typed them
//! ("(555) 010-1234", "+1 555 0101234", "5550101234"). Comparing the last
//! N digits sidesteps country codes and punctuation.

pub fn digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Last `n` digits, or every digit when there are fewer.
pub fn suffix(raw: &str, n: usize) -> String {
    let all = digits(raw);
    let skip = all.len().saturating_sub(n);
    all[skip..].to_string()
}

pub fn same_number(a: &str, b: &str, n: usize) -> bool {
    let a = suffix(a, n);
    !a.is_empty() && a == suffix(b, n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix() {
        assert_eq!(digits("+1 (555) 010-1234"), "15550101234");
        assert_eq!(suffix("+1 (555) 010-1234", 10), "5550101234");
        assert_eq!(suffix("010-1234", 10), "0101234");
        assert_eq!(suffix("no digits", 10), "");
    }

    #[test]
    fn test_same_number() {
        assert!(same_number("+15550101234", "(555) 010-1234", 10));
        assert!(same_number("+52 1 55 1234 5678", "5512345678", 10));
        assert!(!same_number("+15550101234", "+15550101235", 10));
        assert!(!same_number("", "", 10));
        assert!(!same_number("abc", "", 10));
    }
}
