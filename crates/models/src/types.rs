use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

/// A jsonb array of strings (tags, treatment names, photo urls, ...).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct StringList(pub Vec<String>);

impl StringList {
    /// Trimmed, blank entries dropped, duplicates removed keeping first occurrence.
    pub fn cleaned(items: impl IntoIterator<Item = String>) -> Self {
        let mut out: Vec<String> = Vec::new();
        for item in items {
            let t = item.trim();
            if t.is_empty() { continue; }
            if !out.iter().any(|o| o.eq_ignore_ascii_case(t)) {
                out.push(t.to_string());
            }
        }
        Self(out)
    }

    pub fn contains_ignore_case(&self, needle: &str) -> bool {
        self.0.iter().any(|s| s.eq_ignore_ascii_case(needle))
    }
}

impl From<Vec<String>> for StringList {
    fn from(v: Vec<String>) -> Self { Self::cleaned(v) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleaned_drops_blanks_and_duplicates() {
        let l = StringList::cleaned(vec![" Botox ".into(), "".into(), "botox".into(), "Filler".into()]);
        assert_eq!(l.0, vec!["Botox".to_string(), "Filler".to_string()]);
        assert!(l.contains_ignore_case("FILLER"));
    }
}
