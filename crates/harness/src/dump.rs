use std::fs::File;
use std::io::Write;
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;

use freebase_core::vocab::ns;

/// Builds a Freebase-style N-Triples dump line by line. Subjects, predicates
/// and IRI objects are given as dotted local names under the namespace.
#[derive(Debug, Clone, Default)]
pub struct DumpBuilder {
    lines: Vec<String>,
}

impl DumpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iri(mut self, subject: &str, predicate: &str, object: &str) -> Self {
        self.lines.push(format!(
            "<{}>\t<{}>\t<{}>\t.",
            ns(subject),
            ns(predicate),
            ns(object)
        ));
        self
    }

    pub fn text(mut self, subject: &str, predicate: &str, value: &str, language: &str) -> Self {
        self.lines.push(format!(
            "<{}>\t<{}>\t\"{}\"@{language}\t.",
            ns(subject),
            ns(predicate),
            escape(value)
        ));
        self
    }

    pub fn literal(mut self, subject: &str, predicate: &str, value: &str) -> Self {
        self.lines.push(format!(
            "<{}>\t<{}>\t\"{}\"\t.",
            ns(subject),
            ns(predicate),
            escape(value)
        ));
        self
    }

    /// Append a line verbatim.
    pub fn raw(mut self, line: &str) -> Self {
        self.lines.push(line.to_string());
        self
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn to_text(&self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }

    pub fn write_gz(&self, path: &Path) -> std::io::Result<()> {
        let mut encoder = GzEncoder::new(File::create(path)?, Compression::fast());
        encoder.write_all(self.to_text().as_bytes())?;
        encoder.finish()?;
        Ok(())
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
