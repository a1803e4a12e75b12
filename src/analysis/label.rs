use std::cmp::Ordering;
use std::fmt;
use chrono::NaiveDate;
/// Subject prefix of session files, as in `ICMS92_15-Mar-2021.pkl`.
pub const DEFAULT_SESSION_PREFIX: &str = "ICMS92";
pub const SESSION_DATE_FORMAT: &str = "%d-%b-%Y";
/// A session file whose name does not carry a parseable date. Not fatal: the
/// file name is used as the label instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseLabelWarning {
    pub file_name: String,
    pub reason: String,
}
impl fmt::Display for ParseLabelWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot read a session date from {:?}: {}",
            self.file_name, self.reason
        )
    }
}
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionLabel {
    /// Text shown on plots.
    pub text: String,
    pub date: Option<NaiveDate>,
    pub warning: Option<ParseLabelWarning>,
}
impl SessionLabel {
    /// Dated sessions first in calendar order, then the rest by label.
    pub fn chronological(&self, other: &Self) -> Ordering {
        match (self.date, other.date) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.text.cmp(&other.text)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.text.cmp(&other.text),
        }
    }
}
/// Reads the session date out of `<prefix>_<DD>-<MMM>-<YYYY>.<ext>`.
pub fn parse_session_label(file_name: &str, prefix: &str) -> SessionLabel {
    let stem = file_name
        .rsplit_once('.')
        .map_or(file_name, |(stem, _)| stem);
    let parsed = stem
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('_'))
        .ok_or_else(|| format!("expected a {prefix}_DD-MMM-YYYY name"))
        .and_then(|date_text| {
            NaiveDate::parse_from_str(date_text, SESSION_DATE_FORMAT)
                .map(|date| (date_text, date))
                .map_err(|e| format!("{date_text:?} is not a DD-MMM-YYYY date ({e})"))
        });
    match parsed {
        Ok((date_text, date)) => SessionLabel {
            text: date_text.to_owned(),
            date: Some(date),
            warning: None,
        },
        Err(reason) => SessionLabel {
            text: file_name.to_owned(),
            date: None,
            warning: Some(ParseLabelWarning {
                file_name: file_name.to_owned(),
                reason,
            }),
        },
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn parses_dated_session_name() {
        let label = parse_session_label("ICMS92_15-Mar-2021.pkl", DEFAULT_SESSION_PREFIX);
        assert_eq!(label.text, "15-Mar-2021");
        assert_eq!(label.date, NaiveDate::from_ymd_opt(2021, 3, 15));
        assert!(label.warning.is_none());
    }
    #[test]
    fn falls_back_to_file_name() {
        let label = parse_session_label("random.pkl", DEFAULT_SESSION_PREFIX);
        assert_eq!(label.text, "random.pkl");
        assert_eq!(label.date, None);
        let warning = label.warning.unwrap();
        assert_eq!(warning.file_name, "random.pkl");
        assert!(warning.to_string().contains("random.pkl"));
    }
    #[test]
    fn bad_date_is_a_warning() {
        let label = parse_session_label("ICMS92_31-Feb-2021.pkl", DEFAULT_SESSION_PREFIX);
        assert_eq!(label.text, "ICMS92_31-Feb-2021.pkl");
        assert!(label.warning.is_some());
    }
    #[test]
    fn custom_prefix() {
        let label = parse_session_label("ICMS101_02-Jan-2023.json", "ICMS101");
        assert_eq!(label.text, "02-Jan-2023");
    }
    #[test]
    fn sorts_chronologically_then_undated() {
        let mut labels: Vec<SessionLabel> = [
            "zeta.pkl",
            "ICMS92_01-Feb-2021.pkl",
            "ICMS92_15-Mar-2020.pkl",
            "alpha.pkl",
            "ICMS92_10-Jan-2021.pkl",
        ]
        .iter()
        .map(|name| parse_session_label(name, DEFAULT_SESSION_PREFIX))
        .collect();
        labels.sort_by(SessionLabel::chronological);
        let texts: Vec<&str> = labels.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["15-Mar-2020", "10-Jan-2021", "01-Feb-2021", "alpha.pkl", "zeta.pkl"]
        );
    }
}
