//! Legal-domain value types: statute citations, validity dates and currencies.

use chrono::NaiveDate;

/// Highest section number a citation may carry.
pub const MAX_SECTION: u32 = 10_000;

const DATE_FORMATS: [&str; 3] = ["%d-%m-%Y", "%Y-%m-%d", "%m/%d/%Y"];

/// Parses a window bound written as `DD-MM-YYYY`, `YYYY-MM-DD` or `MM/DD/YYYY`.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Returns the reason a citation is malformed, if it is.
pub fn citation_problem(section: &str, subsection: &str, act: &str) -> Option<String> {
    if section.trim().is_empty() {
        return Some("citation section must not be empty".to_string());
    }
    if subsection.trim().is_empty() {
        return Some("citation subsection must not be empty".to_string());
    }
    if act.trim().is_empty() {
        return Some("citation act must not be empty".to_string());
    }

    let digits: String = section.chars().take_while(char::is_ascii_digit).collect();
    match digits.parse::<u32>() {
        Ok(n) if (1..=MAX_SECTION).contains(&n) => {}
        Ok(n) => {
            return Some(format!(
                "citation section {n} is outside 1..={MAX_SECTION}"
            ));
        }
        Err(_) => {
            return Some(format!(
                "citation section `{section}` must start with a section number"
            ));
        }
    }

    if !is_subsection_ident(subsection) {
        return Some(format!(
            "citation subsection `{subsection}` must be numeric, alphabetic, or digits followed by letters"
        ));
    }
    None
}

/// ISO 4217 shape: three capital letters.
pub fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase())
}

fn is_subsection_ident(s: &str) -> bool {
    if s.chars().all(|c| c.is_ascii_digit()) || s.chars().all(|c| c.is_ascii_alphabetic()) {
        return true;
    }
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (num, rest) = s.split_at(split);
    !num.is_empty() && !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_all_three_date_layouts() {
        let expected = NaiveDate::from_ymd_opt(2020, 3, 1);
        assert_eq!(parse_date("01-03-2020"), expected);
        assert_eq!(parse_date("2020-03-01"), expected);
        assert_eq!(parse_date("03/01/2020"), expected);
        assert_eq!(parse_date("2020/03/01"), None);
        assert_eq!(parse_date("31-02-2020"), None);
    }

    #[test]
    fn currency_codes() {
        assert!(is_currency_code("SGD"));
        assert!(!is_currency_code("usd"));
        assert!(!is_currency_code("EURO"));
    }

    #[test]
    fn citation_shapes() {
        assert_eq!(citation_problem("415", "1", "Penal Code"), None);
        assert_eq!(citation_problem("415A", "2b", "Penal Code"), None);
        assert_eq!(citation_problem("378", "a", "Penal Code"), None);
        assert!(citation_problem("", "1", "Penal Code").is_some());
        assert!(citation_problem("415", "1", "").is_some());
        assert!(citation_problem("0", "1", "Penal Code").is_some());
        assert!(citation_problem("10001", "1", "Penal Code").is_some());
        assert!(citation_problem("A1", "1", "Penal Code").is_some());
        assert!(citation_problem("415", "b2", "Penal Code").is_some());
    }
}
