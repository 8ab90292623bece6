use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// One control-channel command in the peer transfer protocol.
///
/// Wire form is the literal verb, with a single space before the file name
/// for `STOR`/`RETR`. File names are a single path component: an
/// alphanumeric/`_`/`-` stem and at most one lowercase-alphabetic
/// extension, so joining one onto the serve root cannot escape it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferCommand {
    List,
    Stor(String),
    Retr(String),
    Quit,
}

impl TransferCommand {
    /// The file name carried by `STOR`/`RETR`, if any.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::Stor(name) | Self::Retr(name) => Some(name),
            Self::List | Self::Quit => None,
        }
    }
}

impl FromStr for TransferCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LIST" => Ok(Self::List),
            "QUIT" => Ok(Self::Quit),
            _ => {
                if let Some(name) = s.strip_prefix("STOR ") {
                    validate_file_name(name)?;
                    Ok(Self::Stor(name.to_string()))
                } else if let Some(name) = s.strip_prefix("RETR ") {
                    validate_file_name(name)?;
                    Ok(Self::Retr(name.to_string()))
                } else {
                    Err(Error::Command(s.to_string()))
                }
            }
        }
    }
}

impl fmt::Display for TransferCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => f.write_str("LIST"),
            Self::Quit => f.write_str("QUIT"),
            Self::Stor(name) => write!(f, "STOR {name}"),
            Self::Retr(name) => write!(f, "RETR {name}"),
        }
    }
}

/// Check a file name against the transfer grammar: `[A-Za-z0-9_-]+` with an
/// optional single `.[a-z]+` extension.
pub fn validate_file_name(name: &str) -> Result<(), Error> {
    let (stem, extension) = match name.split_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (name, None),
    };

    let stem_ok = !stem.is_empty()
        && stem
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    let ext_ok = match extension {
        Some(ext) => !ext.is_empty() && ext.chars().all(|c| c.is_ascii_lowercase()),
        None => true,
    };

    if stem_ok && ext_ok {
        Ok(())
    } else {
        Err(Error::FileName(name.to_string()))
    }
}
