use thiserror::Error;

/// Client-side validation failures. None of these ever reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unbekannter Status: {0}")]
    UnknownStatus(String),

    #[error("Sitzungsname darf nicht leer sein")]
    EmptySessionName,

    #[error("Feld \"{0}\" darf nicht leer sein")]
    EmptyField(&'static str),

    #[error("Dateityp nicht erlaubt: {0}")]
    UnsupportedMimeType(String),

    #[error("Datei ist zu groß ({size} Bytes, maximal {max} Bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Datei ist leer")]
    EmptyFile,

    #[error("mindestens eine Interessengruppe muss ausgewählt werden")]
    NoInterestGroups,

    #[error("Kürzel \"{0}\" ist bereits vergeben")]
    DuplicateCode(String),
}
