use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A wire code that does not belong to the enum it was decoded into.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {field} code: {code}")]
pub struct InvalidCode {
    pub field: &'static str,
    pub code: u8,
}

/// Macro to generate a coded enum: `code()`, `label()`, `from_code()`,
/// and serde as the bare integer code.
macro_rules! code_enum {
    ($name:ident { $($variant:ident => ($code:literal, $label:literal)),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(into = "u8", try_from = "u8")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn code(&self) -> u8 {
                match self {
                    $(Self::$variant => $code),+
                }
            }

            pub fn label(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }

            pub fn from_code(code: u8) -> Result<Self, InvalidCode> {
                match code {
                    $($code => Ok(Self::$variant)),+,
                    _ => Err(InvalidCode {
                        field: stringify!($name),
                        code,
                    }),
                }
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                value.code()
            }
        }

        impl TryFrom<u8> for $name {
            type Error = InvalidCode;

            fn try_from(code: u8) -> Result<Self, Self::Error> {
                Self::from_code(code)
            }
        }
    };
}

code_enum!(Sex {
    Male => (1, "Male"),
    Female => (0, "Female"),
});

code_enum!(YesNo {
    Yes => (1, "Yes"),
    No => (0, "No"),
});

code_enum!(ChestPainType {
    TypicalAngina => (0, "Typical angina"),
    AtypicalAngina => (1, "Atypical angina"),
    NonAnginalPain => (2, "Non-anginal pain"),
    Asymptomatic => (3, "Asymptomatic"),
});

impl YesNo {
    pub fn is_yes(&self) -> bool {
        matches!(self, Self::Yes)
    }
}

impl From<bool> for YesNo {
    fn from(value: bool) -> Self {
        if value {
            Self::Yes
        } else {
            Self::No
        }
    }
}
