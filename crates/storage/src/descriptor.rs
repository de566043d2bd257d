//! Connection descriptors, e.g. `sqlite:///freebase.db`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use rusqlite::Connection;

use crate::error::StorageError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreDescriptor {
    Memory,
    File(PathBuf),
}

impl StoreDescriptor {
    pub fn connect(&self) -> Result<Connection, StorageError> {
        let conn = match self {
            Self::Memory => Connection::open_in_memory()?,
            Self::File(path) => Connection::open(path)?,
        };
        Ok(conn)
    }
}

impl FromStr for StoreDescriptor {
    type Err = StorageError;

    /// Accepts `sqlite:///relative.db`, `sqlite:////absolute.db`,
    /// `sqlite://` / `sqlite://:memory:` / `:memory:`, or a bare path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(StorageError::InvalidDescriptor("empty descriptor".into()));
        }
        if s == ":memory:" || s == "sqlite://" || s == "sqlite://:memory:" {
            return Ok(Self::Memory);
        }
        if let Some(path) = s.strip_prefix("sqlite:///") {
            if path.is_empty() {
                return Err(StorageError::InvalidDescriptor(format!("missing path in {s}")));
            }
            return Ok(Self::File(PathBuf::from(path)));
        }
        if let Some((scheme, _)) = s.split_once("://") {
            return Err(StorageError::InvalidDescriptor(format!(
                "unsupported scheme {scheme:?}"
            )));
        }
        Ok(Self::File(PathBuf::from(s)))
    }
}

impl fmt::Display for StoreDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "sqlite://:memory:"),
            Self::File(path) => write!(f, "sqlite:///{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sqlalchemy_style_urls() {
        assert_eq!(
            "sqlite:///test.db".parse::<StoreDescriptor>().unwrap(),
            StoreDescriptor::File("test.db".into())
        );
        assert_eq!(
            "sqlite:////var/lib/freebase.db".parse::<StoreDescriptor>().unwrap(),
            StoreDescriptor::File("/var/lib/freebase.db".into())
        );
        assert_eq!(
            " sqlite://:memory:\n".parse::<StoreDescriptor>().unwrap(),
            StoreDescriptor::Memory
        );
    }

    #[test]
    fn bare_paths_are_files() {
        assert_eq!(
            "data/freebase.sqlite".parse::<StoreDescriptor>().unwrap(),
            StoreDescriptor::File("data/freebase.sqlite".into())
        );
    }

    #[test]
    fn rejects_other_databases() {
        assert!("mysql://root@localhost/freebase".parse::<StoreDescriptor>().is_err());
        assert!("".parse::<StoreDescriptor>().is_err());
        assert!("sqlite:///".parse::<StoreDescriptor>().is_err());
    }

    #[test]
    fn display_round_trips() {
        let descriptor: StoreDescriptor = "sqlite:///test.db".parse().unwrap();
        assert_eq!(descriptor.to_string().parse::<StoreDescriptor>().unwrap(), descriptor);
    }
}
