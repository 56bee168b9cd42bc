//! RFC822-style "stanza" parsing, as used by `DEBIAN/control` and by
//! `Packages` index files: fields separated by `Key: value`, continuation
//! lines indented by at least one space, stanzas separated by blank lines.
use std::fmt::Write as _;

/// One RFC822 stanza, preserving field insertion order and original casing
/// so a parse-then-render round trip is byte-for-byte stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stanza {
    fields: Vec<(String, String)>,
}

impl Stanza {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)).map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(existing) = self.fields.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
            existing.1 = value;
        } else {
            self.fields.push((key.to_string(), value));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.fields {
            let mut lines = value.split('\n');
            let first = lines.next().unwrap_or_default();
            let _ = writeln!(out, "{key}: {first}");
            for line in lines {
                if line.is_empty() {
                    out.push_str(" .\n");
                } else {
                    let _ = writeln!(out, " {line}");
                }
            }
        }
        out
    }
}

/// Parses a single stanza out of `text`. Ignores leading/trailing blank
/// lines; stops at the first blank line that follows a field.
pub fn parse_stanza(text: &str) -> Stanza {
    let mut stanza = Stanza::new();
    let mut current_key: Option<String> = None;

    for line in text.lines() {
        if line.is_empty() {
            if current_key.is_some() {
                break;
            }
            continue;
        }
        if (line.starts_with(' ') || line.starts_with('\t')) && current_key.is_some() {
            let key = current_key.clone().unwrap();
            let cont = line.trim_start();
            let cont = if cont == "." { "" } else { cont };
            let existing = stanza.fields.iter_mut().find(|(k, _)| k == &key).unwrap();
            existing.1.push('\n');
            existing.1.push_str(cont);
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim().to_string();
            let value = value.trim().to_string();
            stanza.fields.push((key.clone(), value));
            current_key = Some(key);
        }
    }
    stanza
}

/// Splits `text` on blank-line boundaries and parses each chunk. Stanzas
/// that end up with no `Package` field are dropped when `require_package`
/// is set, matching how a `Packages` index is read.
pub fn parse_stanzas(text: &str, require_package: bool) -> Vec<Stanza> {
    let mut stanzas = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if line.is_empty() {
            if !current.is_empty() {
                let stanza = parse_stanza(&current);
                if !stanza.is_empty() && (!require_package || stanza.get("Package").is_some()) {
                    stanzas.push(stanza);
                }
                current.clear();
            }
            continue;
        }
        current.push_str(line);
        current.push('\n');
    }
    if !current.is_empty() {
        let stanza = parse_stanza(&current);
        if !stanza.is_empty() && (!require_package || stanza.get("Package").is_some()) {
            stanzas.push(stanza);
        }
    }
    stanzas
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_fields() {
        let s = parse_stanza("Package: shadow\nVersion: 1.0\nArchitecture: iphoneos-arm\n");
        assert_eq!(s.get("Package"), Some("shadow"));
        assert_eq!(s.get("Version"), Some("1.0"));
        assert_eq!(s.get("architecture"), Some("iphoneos-arm"));
    }

    #[test]
    fn handles_continuation_lines() {
        let s = parse_stanza("Package: foo\nDescription: line one\n line two\n .\n line four\n");
        assert_eq!(s.get("Description"), Some("line one\nline two\n\nline four"));
    }

    #[test]
    fn render_round_trips() {
        let mut s = Stanza::new();
        s.set("Package", "foo");
        s.set("Description", "line one\nline two");
        let rendered = s.render();
        let reparsed = parse_stanza(&rendered);
        assert_eq!(reparsed, s);
    }

    #[test]
    fn splits_multiple_stanzas_and_drops_packageless() {
        let text = "Package: a\nVersion: 1\n\nNotAPackage: true\n\nPackage: b\nVersion: 2\n";
        let stanzas = parse_stanzas(text, true);
        assert_eq!(stanzas.len(), 2);
        assert_eq!(stanzas[0].get("Package"), Some("a"));
        assert_eq!(stanzas[1].get("Package"), Some("b"));
    }
}
