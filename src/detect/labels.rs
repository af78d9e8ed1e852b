use std::io::BufRead;
use std::path::Path;

use anyhow::{Context, Result};

use crate::error::SentryError;

/// Ordered class names indexed by class id. Loaded once, read-only afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassLabelTable {
    names: Vec<String>,
}

impl ClassLabelTable {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Load a newline-delimited label file. An empty table is a configuration error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            SentryError::ConfigurationMissing(format!(
                "label file {}: {}",
                path.display(),
                e
            ))
        })?;
        let table = Self::from_reader(std::io::BufReader::new(file))
            .with_context(|| format!("failed to read label file {}", path.display()))?;
        log::info!(
            "loaded {} class labels from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Blank lines are kept as empty names so indices stay aligned.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut names = Vec::new();
        for line in reader.lines() {
            let line = line?;
            names.push(line.trim_end_matches('\r').to_string());
        }
        while names.last().is_some_and(|name| name.is_empty()) {
            names.pop();
        }
        if names.is_empty() {
            return Err(SentryError::ConfigurationMissing("label table is empty".into()).into());
        }
        Ok(Self { names })
    }

    pub fn name(&self, class_id: usize) -> Option<&str> {
        self.names.get(class_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lines_in_order() -> Result<()> {
        let table = ClassLabelTable::from_reader("person\r\nbicycle\n\ncar\n\n".as_bytes())?;
        assert_eq!(table.len(), 4);
        assert_eq!(table.name(0), Some("person"));
        assert_eq!(table.name(1), Some("bicycle"));
        assert_eq!(table.name(2), Some(""));
        assert_eq!(table.name(3), Some("car"));
        assert_eq!(table.name(4), None);
        Ok(())
    }

    #[test]
    fn empty_table_is_configuration_error() {
        let err = ClassLabelTable::from_reader("\n\n".as_bytes()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SentryError>(),
            Some(SentryError::ConfigurationMissing(_))
        ));
    }

    #[test]
    fn missing_file_is_configuration_error() {
        let err = ClassLabelTable::load("/nonexistent/labels.names").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SentryError>(),
            Some(SentryError::ConfigurationMissing(_))
        ));
    }
}
