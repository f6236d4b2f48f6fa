use chrono::NaiveDate;

const SENTINEL_SPELLINGS: [&str; 3] = ["NA", "NONE", "NULL"];

const FOUR_DIGIT_YEAR_FORMATS: [&str; 9] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d %b %Y",
    "%d-%b-%Y",
    "%b %d, %Y",
];

const TWO_DIGIT_YEAR_FORMATS: [&str; 2] = ["%d-%m-%y", "%d/%m/%y"];

/// Trims `raw` and returns `None` when it carries no information.
pub fn clean_value(raw: &str) -> Option<&str> {
    let value = raw.trim();
    if value.is_empty()
        || SENTINEL_SPELLINGS
            .iter()
            .any(|s| value.eq_ignore_ascii_case(s))
    {
        None
    } else {
        Some(value)
    }
}

/// Rewrites a recognizable date as DD/MM/YYYY; anything else is returned
/// unchanged.
pub fn normalize_date(value: &str) -> String {
    parse_date(value)
        .map(|date| date.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| value.to_string())
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    // chrono's %Y happily reads "24" as year 24, so pick the format family by
    // the shape of the input first.
    let has_four_digit_run = value
        .split(|c: char| !c.is_ascii_digit())
        .any(|run| run.len() == 4);
    let formats: &[&str] = if has_four_digit_run {
        &FOUR_DIGIT_YEAR_FORMATS
    } else {
        &TWO_DIGIT_YEAR_FORMATS
    };
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sentinel_spellings_are_empty() {
        for raw in ["", "   ", "NA", "na", " None ", "NULL", "null"] {
            assert_eq!(clean_value(raw), None, "{raw:?}");
        }
        assert_eq!(clean_value("  NAVEEN  "), Some("NAVEEN"));
    }

    #[test]
    fn normalizes_common_date_shapes() {
        assert_eq!(normalize_date("2024-06-05"), "05/06/2024");
        assert_eq!(normalize_date("05-06-2024"), "05/06/2024");
        assert_eq!(normalize_date("05 Jun 2024"), "05/06/2024");
        assert_eq!(normalize_date("05-Jun-2024"), "05/06/2024");
        assert_eq!(normalize_date("Jun 05, 2024"), "05/06/2024");
        assert_eq!(normalize_date("05/06/24"), "05/06/2024");
    }

    #[test]
    fn keeps_unrecognized_dates() {
        assert_eq!(normalize_date("05/06/2024 00:00 hrs"), "05/06/2024 00:00 hrs");
        assert_eq!(normalize_date("midnight of 4th June"), "midnight of 4th June");
    }
}
