use rand::Rng;

pub const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Returns the English name for a 1-based month number.
pub fn month_name(month: i32) -> &'static str {
    MONTHS
        .get(month as usize - 1)
        .copied()
        .unwrap_or("Unknown")
}

/// Returns the ordinal string for an integer. Example: `3` becomes `3rd`.
pub fn ordinal(n: i64) -> String {
    let suffix = if (10..20).contains(&(n % 100)) {
        "th"
    } else {
        match n % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        }
    };
    format!("{n}{suffix}")
}

/// Returns the last day of a month.
pub fn last_day_of_month(year: i32, month: u32) -> chrono::NaiveDate {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    chrono::NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .expect("valid date")
        .pred_opt()
        .expect("not day zero")
}

/// Returns a random URL-safe base64 string of the given length.
pub fn random_b64_string(len: usize) -> String {
    use base64::Engine;

    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
    let mut ret = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes);
    ret.truncate(len);
    ret
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(4), "4th");
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(12), "12th");
        assert_eq!(ordinal(13), "13th");
        assert_eq!(ordinal(21), "21st");
        assert_eq!(ordinal(111), "111th");
    }

    #[test]
    fn month_bounds() {
        assert_eq!(last_day_of_month(2013, 2).to_string(), "2013-02-28");
        assert_eq!(last_day_of_month(2012, 2).to_string(), "2012-02-29");
        assert_eq!(last_day_of_month(2013, 12).to_string(), "2013-12-31");
    }
}
