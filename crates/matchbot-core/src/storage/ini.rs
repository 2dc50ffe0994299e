//! Minimal ordered INI document.
//!
//! The persisted match file is a byte-level compatibility contract: section
//! order, key order and verbatim values all matter, and duplicate sections
//! must survive in document order. General-purpose INI crates normalize all
//! of that away, so this stays hand-rolled.

/// One `[name]` section with its key/value pairs in document order.
#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    name: String,
    values: Vec<(String, String)>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// First value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.push((key.into(), value.into()));
    }

    pub fn values(&self) -> &[(String, String)] {
        &self.values
    }
}

/// A whole document: sections in order, duplicates preserved.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    sections: Vec<Section>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn push(&mut self, section: Section) {
        self.sections.push(section);
    }

    /// Parse a document. Blank lines are ignored; everything else must be a
    /// `[section]` header or a `key=value` entry under one.
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut doc = Document::new();

        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            if let Some(name) = line
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
            {
                doc.sections.push(Section::new(name));
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(format!("line {}: not a section or key=value", lineno + 1));
            };
            let Some(section) = doc.sections.last_mut() else {
                return Err(format!("line {}: entry outside of any section", lineno + 1));
            };
            section.push(key, value);
        }

        Ok(doc)
    }

    /// Render with one blank line between sections and a trailing newline.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push('[');
            out.push_str(&section.name);
            out.push_str("]\n");
            for (key, value) in &section.values {
                out.push_str(key);
                out.push('=');
                out.push_str(value);
                out.push('\n');
            }
        }
        out
    }
}
