//! Helper macro for enumerations persisted as lowercase text.

/// Define a fieldless enum stored as text together with its parse error.
macro_rules! define_text_enum {
    (
        $(#[$outer:meta])*
        pub enum $name:ident / $error:ident ($label:literal) {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $text:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize,
        )]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Stored text form.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        #[doc = concat!("Error returned when parsing an unknown ", $label, ".")]
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $error {
            /// The unrecognised input value.
            pub input: String,
        }

        impl ::std::fmt::Display for $error {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "unknown {}: {}", $label, self.input)
            }
        }

        impl ::std::error::Error for $error {}

        impl ::std::str::FromStr for $name {
            type Err = $error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err($error {
                        input: s.to_owned(),
                    }),
                }
            }
        }
    };
}

pub(crate) use define_text_enum;

#[cfg(test)]
mod tests {
    define_text_enum! {
        /// Sample enumeration.
        pub enum Shade / ParseShadeError ("shade") {
            Pale => "pale",
            Deep => "deep",
        }
    }

    #[test]
    fn parses_and_displays_stored_text() {
        assert_eq!("deep".parse::<Shade>(), Ok(Shade::Deep));
        assert_eq!(Shade::Pale.to_string(), "pale");
        assert_eq!(Shade::ALL, &[Shade::Pale, Shade::Deep]);
    }

    #[test]
    fn rejects_unknown_text_with_label() {
        let err = "Deep".parse::<Shade>().expect_err("case sensitive");
        assert_eq!(err.to_string(), "unknown shade: Deep");
    }

    #[test]
    fn serde_uses_stored_text() {
        let json = serde_json::to_string(&Shade::Deep).expect("serialise");
        assert_eq!(json, "\"deep\"");
    }
}
