/// Normalises a ban reason (spec §4.4): trim, collapse internal whitespace
/// runs to a single space, lowercase, strip a trailing period.
pub fn normalize(reason: &str) -> String {
    let collapsed = reason
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    collapsed.strip_suffix('.').map(str::to_string).unwrap_or(collapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_collapses_lowercases_and_strips_trailing_period() {
        assert_eq!(normalize("  Spam   Bot Abuse.  "), "spam bot abuse");
    }

    #[test]
    fn leaves_an_already_normal_reason_unchanged() {
        assert_eq!(normalize("spam"), "spam");
    }
}
