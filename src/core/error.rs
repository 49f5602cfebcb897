// Closed error-kind set with stable integer codes, plus contextual error values.
use std::error::Error as StdError;
use std::fmt;

use bstr::ByteSlice;

/// Every fallible accessor reports exactly one of these kinds.
///
/// The integer codes returned by [`ErrorKind::code`] are part of the plugin
/// ABI and never change meaning between releases.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    MemoryAllocation,
    NoSuchLeaf,
    NoSuchElement,
    WrongSeedType,
    Immutable,
    Undeletable,
    NoSuchPlant,
    WrongPlantType,
}

pub const SUCCESS_CODE: i32 = 0;

impl ErrorKind {
    pub const ALL: [ErrorKind; 8] = [
        ErrorKind::MemoryAllocation,
        ErrorKind::NoSuchLeaf,
        ErrorKind::NoSuchElement,
        ErrorKind::WrongSeedType,
        ErrorKind::Immutable,
        ErrorKind::Undeletable,
        ErrorKind::NoSuchPlant,
        ErrorKind::WrongPlantType,
    ];

    pub fn code(self) -> i32 {
        match self {
            ErrorKind::MemoryAllocation => 1,
            ErrorKind::NoSuchLeaf => 2,
            ErrorKind::NoSuchElement => 3,
            ErrorKind::WrongSeedType => 4,
            ErrorKind::Immutable => 5,
            ErrorKind::Undeletable => 6,
            ErrorKind::NoSuchPlant => 32,
            ErrorKind::WrongPlantType => 256,
        }
    }

    /// Reverse of [`ErrorKind::code`]. `0` (success) and unknown codes map to `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    pub fn literal(self) -> &'static str {
        match self {
            ErrorKind::MemoryAllocation => "MEMORY_ALLOCATION",
            ErrorKind::NoSuchLeaf => "NOSUCH_LEAF",
            ErrorKind::NoSuchElement => "NOSUCH_ELEMENT",
            ErrorKind::WrongSeedType => "WRONG_SEED_TYPE",
            ErrorKind::Immutable => "IMMUTABLE",
            ErrorKind::Undeletable => "UNDELETABLE",
            ErrorKind::NoSuchPlant => "NOSUCH_PLANT",
            ErrorKind::WrongPlantType => "WRONG_PLANT_TYPE",
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            ErrorKind::MemoryAllocation => "Memory allocation error",
            ErrorKind::NoSuchLeaf => "Invalid property",
            ErrorKind::NoSuchElement => "Invalid element",
            ErrorKind::WrongSeedType => "Incorrect property type",
            ErrorKind::Immutable => "Read only property",
            ErrorKind::Undeletable => "Undeletable property",
            ErrorKind::NoSuchPlant => "Invalid plant",
            ErrorKind::WrongPlantType => "Incorrect plant type",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    key: Option<String>,
    plant: Option<u64>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            key: None,
            plant: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> i32 {
        self.kind.code()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn plant(&self) -> Option<u64> {
        self.plant
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Keys are bytes; the stored label is lossily decoded for display.
    pub fn with_key(mut self, key: impl AsRef<[u8]>) -> Self {
        self.key = Some(key.as_ref().to_str_lossy().into_owned());
        self
    }

    pub fn with_plant(mut self, plant: u64) -> Self {
        self.plant = Some(plant);
        self
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.literal())?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(key) = &self.key {
            write!(f, " (key: {key})")?;
        }
        if let Some(plant) = self.plant {
            write!(f, " (plant: {plant:#x})")?;
        }
        Ok(())
    }
}

impl StdError for Error {}

/// Stable process exit codes for the CLI; `0` is reserved for success and
/// `2` for usage errors reported by the binary itself.
pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::MemoryAllocation => 3,
        ErrorKind::NoSuchLeaf => 4,
        ErrorKind::NoSuchElement => 5,
        ErrorKind::WrongSeedType => 6,
        ErrorKind::Immutable => 7,
        ErrorKind::Undeletable => 8,
        ErrorKind::NoSuchPlant => 9,
        ErrorKind::WrongPlantType => 10,
    }
}
